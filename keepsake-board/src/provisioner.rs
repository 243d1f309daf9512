//! The QR provisioning loop.
//!
//! Points the camera at QR codes and acts on what it reads. A `WIFI:`
//! payload merges the scanned credentials into the on-card settings file
//! (when this boot is allowed to write it) and then offers a short
//! countdown to join the network immediately; any other payload is just
//! shown on screen. A payload is acted on once and then suppressed until
//! a different one is scanned.

use core::fmt::Write;

use heapless::String;
use keepsake::config::SettingsFile;
use keepsake::frame::FrameBuf;
use keepsake::wifi::WifiCredentials;

use crate::board::{CameraBoard, MessageKind, QrPayload, QrScanner, SettingsStore, WifiRadio};

/// Settings key for the network name.
pub const SSID_KEY: &str = "WIFI_SSID";
/// Settings key for the passphrase.
pub const PSK_KEY: &str = "WIFI_PSK";

/// Ticks in the join countdown (displayed in 1/20ths, so 65 ticks reads
/// 3..0).
pub const JOIN_COUNTDOWN_TICKS: u32 = 65;
/// Length of one countdown tick.
pub const JOIN_TICK_MS: u32 = 50;
/// Largest settings file the provisioner will read or rewrite.
const SETTINGS_BUF_LEN: usize = 1024;

/// The provisioning collaborators, bundled. The firmware board
/// implements all four traits on one object; so does the test double.
pub trait ProvisionRig: CameraBoard + SettingsStore + QrScanner + WifiRadio {}

impl<T: CameraBoard + SettingsStore + QrScanner + WifiRadio> ProvisionRig for T {}

/// State carried across provisioning iterations.
#[derive(Default)]
pub struct Provisioner {
    last_payload: Option<QrPayload>,
}

impl Provisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the loop forever.
    pub async fn run<R: ProvisionRig>(&mut self, rig: &mut R, frame: &mut FrameBuf<'_>) -> ! {
        rig.prepare_qr_scan().await;
        info!(
            "provisioning loop starting (settings {})",
            if rig.writable() { "writable" } else { "read-only" }
        );
        loop {
            self.step(rig, frame).await;
        }
    }

    /// One iteration: one frame scanned, at most one payload handled.
    pub async fn step<R: ProvisionRig>(&mut self, rig: &mut R, frame: &mut FrameBuf<'_>) {
        if let Err(err) = rig.capture_into(frame).await {
            warn!("frame capture failed: {}", err);
            return;
        }
        rig.blit(frame).await;

        let Some(payload) = rig.scan(frame).await else {
            return;
        };
        if self.last_payload.as_ref() == Some(&payload) {
            return;
        }
        info!("decoded payload: {}", payload.as_str());
        rig.tone(200, 100).await;

        if let Ok(creds) = WifiCredentials::parse(&payload) {
            handle_wifi(rig, &creds).await;
        }

        // Every new payload ends up on screen, Wi-Fi or not.
        rig.display_message(&payload, MessageKind::Info).await;
        rig.delay_ms(1000).await;
        self.last_payload = Some(payload);
    }
}

/// The whole Wi-Fi path: settings merge, then the join offer.
async fn handle_wifi<R: ProvisionRig>(rig: &mut R, creds: &WifiCredentials) {
    rig.display_message("WIFI", MessageKind::Info).await;
    rig.tone(140, 500).await;

    let mut buf = [0u8; SETTINGS_BUF_LEN];
    let mut file = match rig.read(&mut buf).await {
        Ok(len) => {
            let text = core::str::from_utf8(&buf[..len]).unwrap_or_default();
            let (file, skipped) = SettingsFile::parse(text);
            if skipped > 0 {
                warn!("settings file: {} malformed lines skipped", skipped);
            }
            file
        }
        Err(err) => {
            warn!("settings read failed: {}", err);
            SettingsFile::new()
        }
    };

    let unchanged = file.get_str(SSID_KEY) == Some(creds.ssid.as_str())
        && file.get_str(PSK_KEY) == Some(creds.password.as_str());
    if unchanged {
        info!("credentials unchanged");
        return;
    }

    rig.display_message("WIFI CHANGING...", MessageKind::Info)
        .await;
    rig.tone(320, 250).await;

    if !rig.writable() {
        rig.display_message(
            "FS READONLY!\nHold Shutter\nwhen booting",
            MessageKind::Error,
        )
        .await;
        rig.tone(560, 250).await;
        rig.delay_ms(2500).await;
    } else {
        match merge_and_write(rig, &mut file, creds).await {
            Ok(()) => {
                info!("settings rewritten for {}", creds.ssid.as_str());
                rig.display_message("WIFI CHANGED!", MessageKind::Info).await;
                rig.tone(440, 250).await;
            }
            Err(()) => {
                rig.display_message("Write\nFailed", MessageKind::Error).await;
            }
        }
    }

    rig.delay_ms(1000).await;
    offer_join(rig, creds).await;
}

async fn merge_and_write<R: ProvisionRig>(
    rig: &mut R,
    file: &mut SettingsFile,
    creds: &WifiCredentials,
) -> Result<(), ()> {
    let merged = file.set_str(SSID_KEY, &creds.ssid).is_ok()
        && file.set_str(PSK_KEY, &creds.password).is_ok();
    if !merged {
        error!("settings table full, keys not merged");
        return Err(());
    }
    let mut text: String<SETTINGS_BUF_LEN> = String::new();
    if file.render(&mut text).is_err() {
        error!("settings file too large to render");
        return Err(());
    }
    rig.write(&text).await.map_err(|err| {
        warn!("settings write failed: {}", err);
    })
}

/// Bounded countdown asking whether to join the new network right away.
async fn offer_join<R: ProvisionRig>(rig: &mut R, creds: &WifiCredentials) {
    let mut ticks = JOIN_COUNTDOWN_TICKS;
    let mut inputs = rig.poll_inputs().await;
    while !inputs.shutter.held && ticks > 0 {
        ticks -= 1;
        let mut text: String<96> = String::new();
        let _ = write!(
            text,
            "Would you like to\njoin network now?\nPress Shutter if yes\n    {}",
            ticks / 20
        );
        rig.display_message(&text, MessageKind::Info).await;
        rig.delay_ms(JOIN_TICK_MS).await;
        inputs = rig.poll_inputs().await;
    }
    if !inputs.shutter.held {
        return;
    }
    rig.display_message("Joining Network...", MessageKind::Info)
        .await;
    rig.reset().await;
    match rig.join(&creds.ssid, &creds.password).await {
        Ok(()) => info!("joined {}", creds.ssid.as_str()),
        Err(err) => warn!("join failed: {}", err),
    }
    rig.delay_ms(750).await;
    rig.display_message("", MessageKind::Info).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::TimelapseStatus;
    use crate::buttons::{ButtonEvents, Inputs};
    use crate::error::{CaptureError, RadioError, StorageError};
    use crate::testkit::{Call, RadioCall, ScriptedBoard, TestBufs};
    use embassy_futures::block_on;
    use keepsake::mode::CaptureMode;

    fn step(prov: &mut Provisioner, rig: &mut ScriptedBoard, bufs: &mut TestBufs) {
        let mut frames = bufs.frames();
        block_on(prov.step(rig, &mut frames.scratch));
    }

    fn qr(text: &str) -> QrPayload {
        QrPayload::try_from(text).unwrap()
    }

    fn held_shutter() -> Inputs {
        Inputs {
            shutter: ButtonEvents {
                held: true,
                ..ButtonEvents::default()
            },
            ..Inputs::default()
        }
    }

    #[test]
    fn no_payload_only_blits() {
        let mut rig = ScriptedBoard::new(CaptureMode::Preview);
        let mut bufs = TestBufs::new();
        step(&mut Provisioner::new(), &mut rig, &mut bufs);
        assert!(matches!(rig.calls[0], Call::CaptureInto));
        assert!(matches!(rig.calls[1], Call::Blit(_)));
        assert!(!rig.calls.iter().any(|c| matches!(c, Call::Tone(_, _))));
    }

    #[test]
    fn capture_error_skips_iteration() {
        let mut rig = ScriptedBoard::new(CaptureMode::Preview);
        let mut bufs = TestBufs::new();
        rig.capture_result = Err(CaptureError::Timeout);
        rig.push_payload(Some(qr("hello")));
        step(&mut Provisioner::new(), &mut rig, &mut bufs);
        assert!(!rig.calls.iter().any(|c| matches!(c, Call::Blit(_))));
        assert!(rig.scans == 0, "no scan without a frame");
    }

    #[test]
    fn non_wifi_payload_is_displayed() {
        let mut rig = ScriptedBoard::new(CaptureMode::Preview);
        let mut bufs = TestBufs::new();
        rig.push_payload(Some(qr("hello world")));
        step(&mut Provisioner::new(), &mut rig, &mut bufs);
        assert!(rig.calls.contains(&Call::Tone(200, 100)));
        assert!(rig
            .calls
            .contains(&Call::message("hello world", MessageKind::Info)));
        assert!(rig.calls.contains(&Call::DelayMs(1000)));
        assert!(rig.radio_calls.is_empty());
    }

    #[test]
    fn repeated_payload_is_suppressed() {
        let mut prov = Provisioner::new();
        let mut rig = ScriptedBoard::new(CaptureMode::Preview);
        let mut bufs = TestBufs::new();
        rig.push_payload(Some(qr("hello")));
        rig.push_payload(Some(qr("hello")));
        step(&mut prov, &mut rig, &mut bufs);
        step(&mut prov, &mut rig, &mut bufs);
        let tones = rig
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Tone(200, 100)))
            .count();
        assert_eq!(tones, 1);
    }

    #[test]
    fn changed_payload_is_processed_again() {
        let mut prov = Provisioner::new();
        let mut rig = ScriptedBoard::new(CaptureMode::Preview);
        let mut bufs = TestBufs::new();
        rig.push_payload(Some(qr("one")));
        rig.push_payload(Some(qr("two")));
        step(&mut prov, &mut rig, &mut bufs);
        step(&mut prov, &mut rig, &mut bufs);
        assert!(rig.calls.contains(&Call::message("one", MessageKind::Info)));
        assert!(rig.calls.contains(&Call::message("two", MessageKind::Info)));
    }

    #[test]
    fn new_wifi_payload_rewrites_settings() {
        let mut rig = ScriptedBoard::new(CaptureMode::Preview);
        let mut bufs = TestBufs::new();
        rig.settings_text("WEB_PORT = 80\nWIFI_SSID = \"oldnet\"\nWIFI_PSK = \"oldpass\"\n");
        rig.push_payload(Some(qr("WIFI:S:newnet;P:newpass;;")));
        step(&mut Provisioner::new(), &mut rig, &mut bufs);

        let written = rig.written.as_ref().expect("file rewritten");
        assert_eq!(
            written.as_str(),
            "WEB_PORT = 80\nWIFI_SSID = \"newnet\"\nWIFI_PSK = \"newpass\"\n"
        );
        assert!(rig.calls.contains(&Call::message("WIFI", MessageKind::Info)));
        assert!(rig
            .calls
            .contains(&Call::message("WIFI CHANGING...", MessageKind::Info)));
        assert!(rig
            .calls
            .contains(&Call::message("WIFI CHANGED!", MessageKind::Info)));
        assert!(rig.calls.contains(&Call::Tone(140, 500)));
        assert!(rig.calls.contains(&Call::Tone(320, 250)));
        assert!(rig.calls.contains(&Call::Tone(440, 250)));
    }

    #[test]
    fn unchanged_credentials_skip_the_rewrite() {
        let mut rig = ScriptedBoard::new(CaptureMode::Preview);
        let mut bufs = TestBufs::new();
        rig.settings_text("WIFI_SSID = \"samenet\"\nWIFI_PSK = \"samepass\"\n");
        rig.push_payload(Some(qr("WIFI:S:samenet;P:samepass;;")));
        step(&mut Provisioner::new(), &mut rig, &mut bufs);
        assert!(rig.written.is_none());
        assert!(!rig
            .calls
            .contains(&Call::message("WIFI CHANGING...", MessageKind::Info)));
        // The payload itself still shows.
        assert!(rig
            .calls
            .contains(&Call::message("WIFI:S:samenet;P:samepass;;", MessageKind::Info)));
    }

    #[test]
    fn read_only_store_is_not_rewritten() {
        let mut rig = ScriptedBoard::new(CaptureMode::Preview);
        let mut bufs = TestBufs::new();
        rig.writable = false;
        rig.push_payload(Some(qr("WIFI:S:newnet;P:newpass;;")));
        step(&mut Provisioner::new(), &mut rig, &mut bufs);
        assert!(rig.written.is_none());
        assert!(rig.calls.contains(&Call::message(
            "FS READONLY!\nHold Shutter\nwhen booting",
            MessageKind::Error
        )));
        assert!(rig.calls.contains(&Call::Tone(560, 250)));
        assert!(rig.calls.contains(&Call::DelayMs(2500)));
    }

    #[test]
    fn settings_read_error_still_writes_both_keys() {
        let mut rig = ScriptedBoard::new(CaptureMode::Preview);
        let mut bufs = TestBufs::new();
        rig.read_result = Err(StorageError::Filesystem);
        rig.push_payload(Some(qr("WIFI:S:net;P:pw;;")));
        step(&mut Provisioner::new(), &mut rig, &mut bufs);
        assert_eq!(
            rig.written.as_ref().map(|s| s.as_str()),
            Some("WIFI_SSID = \"net\"\nWIFI_PSK = \"pw\"\n")
        );
    }

    #[test]
    fn write_failure_shows_message() {
        let mut rig = ScriptedBoard::new(CaptureMode::Preview);
        let mut bufs = TestBufs::new();
        rig.write_result = Err(StorageError::Filesystem);
        rig.push_payload(Some(qr("WIFI:S:net;P:pw;;")));
        step(&mut Provisioner::new(), &mut rig, &mut bufs);
        assert!(rig
            .calls
            .contains(&Call::message("Write\nFailed", MessageKind::Error)));
        assert!(!rig
            .calls
            .contains(&Call::message("WIFI CHANGED!", MessageKind::Info)));
    }

    #[test]
    fn countdown_expires_without_a_join() {
        let mut rig = ScriptedBoard::new(CaptureMode::Preview);
        let mut bufs = TestBufs::new();
        rig.push_payload(Some(qr("WIFI:S:net;P:pw;;")));
        step(&mut Provisioner::new(), &mut rig, &mut bufs);
        let countdown_ticks = rig
            .calls
            .iter()
            .filter(|c| **c == Call::DelayMs(JOIN_TICK_MS))
            .count();
        assert_eq!(countdown_ticks as u32, JOIN_COUNTDOWN_TICKS);
        assert!(rig.radio_calls.is_empty());
    }

    #[test]
    fn shutter_during_countdown_joins_network() {
        let mut rig = ScriptedBoard::new(CaptureMode::Preview);
        let mut bufs = TestBufs::new();
        rig.push_payload(Some(qr("WIFI:S:net;T:WPA2;P:pw;;")));
        // Prime poll, two countdown polls, then the shutter lands.
        rig.push_inputs(Inputs::default());
        rig.push_inputs(Inputs::default());
        rig.push_inputs(held_shutter());
        step(&mut Provisioner::new(), &mut rig, &mut bufs);

        assert!(rig
            .calls
            .contains(&Call::message("Joining Network...", MessageKind::Info)));
        assert_eq!(rig.radio_calls[0], RadioCall::Reset);
        assert_eq!(rig.radio_calls[1], RadioCall::join("net", "pw"));
        // Display cleared after the attempt.
        assert!(rig.calls.contains(&Call::message("", MessageKind::Info)));
        assert!(rig.calls.contains(&Call::DelayMs(750)));
    }

    #[test]
    fn join_failure_is_not_fatal() {
        let mut rig = ScriptedBoard::new(CaptureMode::Preview);
        let mut bufs = TestBufs::new();
        rig.join_result = Err(RadioError::JoinFailed);
        rig.push_payload(Some(qr("WIFI:S:net;P:pw;;")));
        rig.push_inputs(held_shutter());
        step(&mut Provisioner::new(), &mut rig, &mut bufs);
        // The loop still reaches the payload display afterwards.
        assert!(rig
            .calls
            .contains(&Call::message("WIFI:S:net;P:pw;;", MessageKind::Info)));

        // And the next frame scans normally.
        rig.push_payload(Some(qr("later")));
        step(&mut Provisioner::new(), &mut rig, &mut bufs);
        assert!(rig.calls.contains(&Call::message("later", MessageKind::Info)));
    }

    #[test]
    fn wifi_flow_leaves_timelapse_overlay_alone() {
        // The provisioner only ever drives messages and the scan banner;
        // it must not push time-lapse state the camera loop owns.
        let mut rig = ScriptedBoard::new(CaptureMode::Preview);
        let mut bufs = TestBufs::new();
        rig.push_payload(Some(qr("WIFI:S:net;P:pw;;")));
        step(&mut Provisioner::new(), &mut rig, &mut bufs);
        assert!(!rig
            .calls
            .iter()
            .any(|c| matches!(c, Call::Status(TimelapseStatus::Waiting { .. }))));
    }
}
