//! PlayStation Move controllers over hidapi.
//!
//! [`HidTransport`] enumerates every hidapi device matching the Move's vendor/product id and
//! uses the hidapi path as the [`DeviceIdentity`]. [`accept_device`] drops the extra
//! collections Windows reports for one controller. Handles are opened in non-blocking mode and
//! each read drains a bounded number of queued input reports, keeping only the newest.
//!
//! Only buttons and the trigger are decoded. Inertial data is ignored and the pose stays at
//! its default.

use crate::controller::{Button, ButtonStates, ControllerSample};
use crate::device::{DeviceEnumerator, DeviceHandle, DeviceIdentity, DeviceRead, Transport};
use crate::error::TransportError;
use hidapi::{HidApi, HidDevice};
use std::ffi::{CStr, CString};
use tracing::{debug, warn};

pub const PSMOVE_VENDOR_ID: u16 = 0x054c;
pub const PSMOVE_PRODUCT_ID: u16 = 0x03d5;

const INPUT_REPORT_ID: u8 = 0x01;
const OUTPUT_REPORT_ID: u8 = 0x02;
const REPORT_LEN: usize = 49;

/// Maximum number of input reports drained per read.
const MAX_REPORTS_PER_TICK: usize = 32;

// Positions in the combined 24-bit button word, see `raw_button_word`.
const WIRE_BITS: [(Button, u32); Button::COUNT] = [
    (Button::Triangle, 4),
    (Button::Circle, 5),
    (Button::Cross, 6),
    (Button::Square, 7),
    (Button::Select, 8),
    (Button::Start, 11),
    (Button::PS, 16),
    (Button::Move, 19),
];

/// Buttons and trigger from one input report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputReport {
    /// Logical "is down" bitset, bit `n` = [`Button::bit`] `n`.
    pub buttons: u8,
    pub trigger: u8,
}

fn raw_button_word(data: &[u8]) -> u32 {
    u32::from(data[2])
        | u32::from(data[1]) << 8
        | u32::from(data[3] & 0x01) << 16
        | u32::from(data[4] & 0xf0) << 13
}

/// Decode an input report including its leading report id byte.
///
/// Returns `None` for other report ids and for short reads.
pub fn decode_input_report(data: &[u8]) -> Option<InputReport> {
    if data.len() < 6 || data[0] != INPUT_REPORT_ID {
        return None;
    }

    let word = raw_button_word(data);
    let buttons = WIRE_BITS
        .iter()
        .filter(|(_, wire)| word & (1u32 << *wire) != 0)
        .fold(0u8, |mask, (button, _)| mask | (1 << button.bit()));

    Some(InputReport {
        buttons,
        trigger: data[5],
    })
}

/// Output report setting the sphere LED off and the rumble motor to `amount`.
pub fn rumble_report(amount: u8) -> [u8; REPORT_LEN] {
    let mut report = [0u8; REPORT_LEN];
    report[0] = OUTPUT_REPORT_ID;
    report[6] = amount;
    report
}

/// Keep one hidapi entry per physical controller.
///
/// Windows lists every top-level collection of a device as its own path (`...&col01#...`,
/// `...&col02#...`); only the first one carries the input report. Elsewhere a controller is a
/// single entry, which must sit on Generic Desktop (not mouse or keyboard) or a vendor page.
/// Page `0` is what backends without descriptor access report.
pub fn accept_device(path: &str, usage_page: u16, usage: u16) -> bool {
    let lower = path.to_ascii_lowercase();
    if lower.contains("&col") {
        return lower.contains("&col01#");
    }

    let is_generic_desktop = usage_page == 0x01;
    let is_vendor_defined = usage_page & 0xff00 == 0xff00;

    if is_generic_desktop && matches!(usage, 0x02 | 0x06) {
        return false;
    }
    usage_page == 0 || is_generic_desktop || is_vendor_defined
}

/// Identity for an accepted hidapi entry.
///
/// Paths that are not UTF-8 are skipped: a lossy conversion would not round-trip through
/// `open`.
fn identity_for(path: &CStr, usage_page: u16, usage: u16) -> Option<DeviceIdentity> {
    let Ok(path) = path.to_str() else {
        debug!(?path, "skipping hid device with non-UTF-8 path");
        return None;
    };
    accept_device(path, usage_page, usage).then(|| DeviceIdentity::new(path))
}

/// hidapi-backed [`Transport`] for PS Move controllers.
#[derive(Default)]
pub struct HidTransport {
    api: Option<HidApi>,
}

impl HidTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn api(&self) -> Result<&HidApi, TransportError> {
        self.api
            .as_ref()
            .ok_or_else(|| TransportError::Rejected("hidapi is not initialized".into()))
    }
}

impl DeviceEnumerator for HidTransport {
    fn snapshot(&mut self) -> Vec<DeviceIdentity> {
        let Some(api) = self.api.as_mut() else {
            return Vec::new();
        };

        // On failure hidapi keeps the previous list, which is still the best guess.
        if let Err(err) = api.refresh_devices() {
            warn!(error = %err, "hid device refresh failed, using cached list");
        }

        api.device_list()
            .filter(|info| {
                info.vendor_id() == PSMOVE_VENDOR_ID && info.product_id() == PSMOVE_PRODUCT_ID
            })
            .filter_map(|info| identity_for(info.path(), info.usage_page(), info.usage()))
            .collect()
    }
}

impl Transport for HidTransport {
    fn init(&mut self) -> Result<(), TransportError> {
        if self.api.is_none() {
            self.api = Some(HidApi::new()?);
            debug!("hidapi initialized");
        }
        Ok(())
    }

    fn open(&mut self, identity: &DeviceIdentity) -> Result<Box<dyn DeviceHandle>, TransportError> {
        let path = CString::new(identity.as_str())
            .map_err(|_| TransportError::InvalidIdentity(identity.clone()))?;
        let device = self.api()?.open_path(&path)?;
        device.set_blocking_mode(false)?;

        Ok(Box::new(PsMoveHandle {
            device,
            buf: [0u8; REPORT_LEN],
            previous_buttons: 0,
        }))
    }

    fn shutdown(&mut self) {
        if self.api.take().is_some() {
            debug!("hidapi released");
        }
    }
}

struct PsMoveHandle {
    device: HidDevice,
    buf: [u8; REPORT_LEN],
    previous_buttons: u8,
}

impl DeviceHandle for PsMoveHandle {
    fn read(&mut self) -> DeviceRead {
        let mut latest = None;

        for _ in 0..MAX_REPORTS_PER_TICK {
            match self.device.read(&mut self.buf) {
                Ok(0) => break,
                Ok(n) => {
                    if let Some(report) = decode_input_report(&self.buf[..n]) {
                        latest = Some(report);
                    }
                }
                Err(err) => return DeviceRead::Failed(err.into()),
            }
        }

        let Some(report) = latest else {
            return DeviceRead::Idle;
        };

        let buttons = ButtonStates::advance(self.previous_buttons, report.buttons);
        self.previous_buttons = report.buttons;
        DeviceRead::Sample(ControllerSample {
            buttons,
            trigger: report.trigger,
            ..Default::default()
        })
    }

    fn set_rumble(&mut self, amount: u8) -> Result<(), TransportError> {
        self.device.write(&rumble_report(amount))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(b1: u8, b2: u8, b3: u8, b4: u8, trigger: u8) -> [u8; REPORT_LEN] {
        let mut r = [0u8; REPORT_LEN];
        r[0] = INPUT_REPORT_ID;
        r[1] = b1;
        r[2] = b2;
        r[3] = b3;
        r[4] = b4;
        r[5] = trigger;
        r
    }

    fn mask(buttons: &[Button]) -> u8 {
        buttons.iter().fold(0, |m, b| m | (1 << b.bit()))
    }

    #[test]
    fn face_buttons_live_in_the_second_byte() {
        let decoded = decode_input_report(&report(0, 0xf0, 0, 0, 0)).unwrap();
        assert_eq!(
            decoded.buttons,
            mask(&[Button::Triangle, Button::Circle, Button::Cross, Button::Square])
        );
    }

    #[test]
    fn select_start_ps_move() {
        let decoded = decode_input_report(&report(0x09, 0, 0x01, 0x40, 0)).unwrap();
        assert_eq!(
            decoded.buttons,
            mask(&[Button::Select, Button::Start, Button::PS, Button::Move])
        );
    }

    #[test]
    fn unrelated_bits_are_ignored() {
        // d-pad style bits and the T button have no logical button
        let decoded = decode_input_report(&report(0x06, 0x0f, 0xfe, 0x8f, 0)).unwrap();
        assert_eq!(decoded.buttons, 0);
    }

    #[test]
    fn trigger_is_byte_five() {
        let decoded = decode_input_report(&report(0, 0, 0, 0, 200)).unwrap();
        assert_eq!(decoded.trigger, 200);
    }

    #[test]
    fn rejects_other_reports() {
        let mut r = report(0, 0xff, 0, 0, 0);
        r[0] = 0x04;
        assert_eq!(decode_input_report(&r), None);
        assert_eq!(decode_input_report(&[INPUT_REPORT_ID, 0, 0]), None);
    }

    #[test]
    fn windows_collections_count_once() {
        let col1 = concat!(
            r"\\?\hid#{00001124-0000-1000-8000-00805f9b34fb}_vid&0002054c_pid&03d5",
            r"&col01#9&2f7a2c5c&0&0000#{4d1e55b2-f16f-11cf-88cb-001111000030}",
        );
        let col2 = col1.replace("&col01#", "&col02#");
        let col3 = col1.replace("&col01#", "&COL03#");

        assert!(accept_device(col1, 0x01, 0x04));
        assert!(!accept_device(&col2, 0x01, 0x04));
        assert!(!accept_device(&col3, 0xff00, 0x01));
        assert!(accept_device(&col1.to_uppercase(), 0x01, 0x04));
    }

    #[test]
    fn single_entry_paths_filter_on_usage() {
        assert!(accept_device("/dev/hidraw3", 0x01, 0x04));
        assert!(accept_device("/dev/hidraw3", 0xff00, 0x01));
        assert!(accept_device("DevSrvsID:4294971214", 0, 0));
        assert!(!accept_device("/dev/hidraw3", 0x01, 0x02));
        assert!(!accept_device("/dev/hidraw3", 0x01, 0x06));
        assert!(!accept_device("/dev/hidraw3", 0x0c, 0x01));
    }

    #[test]
    fn non_utf8_paths_are_skipped() {
        let bad = CStr::from_bytes_with_nul(b"/dev/hid\xffraw0\0").unwrap();
        assert_eq!(identity_for(bad, 0x01, 0x04), None);

        let good = CStr::from_bytes_with_nul(b"/dev/hidraw0\0").unwrap();
        assert_eq!(
            identity_for(good, 0x01, 0x04),
            Some(DeviceIdentity::from("/dev/hidraw0"))
        );
    }

    #[test]
    fn rumble_report_layout() {
        let r = rumble_report(0x80);
        assert_eq!(r.len(), REPORT_LEN);
        assert_eq!(r[0], OUTPUT_REPORT_ID);
        assert_eq!(r[6], 0x80);
        assert!(r[1..6].iter().all(|b| *b == 0));
    }

    #[test]
    fn snapshot_before_init_is_empty() {
        let mut transport = HidTransport::new();
        assert!(transport.snapshot().is_empty());
        assert!(matches!(
            transport.open(&DeviceIdentity::from("/dev/hidraw0")),
            Err(TransportError::Rejected(_))
        ));
    }

    #[test]
    fn interior_nul_is_an_invalid_identity() {
        let mut transport = HidTransport::new();
        assert!(matches!(
            transport.open(&DeviceIdentity::from("bad\0path")),
            Err(TransportError::InvalidIdentity(_))
        ));
    }
}
