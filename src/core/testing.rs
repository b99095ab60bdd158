//! Scripted in-memory KMS device for tests.
//!
//! Records every transport call. Page-flip and mode-set results can be
//! queued, and each drain wait can deliver, drop, delay or fail the
//! pending completion events.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use crate::core::transport::*;

#[derive(Debug, Clone, PartialEq)]
pub struct TestMode {
    pub width: u16,
    pub height: u16,
    pub vrefresh: u32,
    pub preferred: bool,
}

impl TestMode {
    pub fn new(width: u16, height: u16, vrefresh: u32, preferred: bool) -> Self {
        Self { width, height, vrefresh, preferred }
    }
}

impl DisplayMode for TestMode {
    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn vrefresh(&self) -> u32 {
        self.vrefresh
    }

    fn is_preferred(&self) -> bool {
        self.preferred
    }

    fn name(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// A connector offering 1280x720 and a preferred 1920x1080@60.
pub fn test_connector(id: u32, connected: bool, encoder: u32) -> Connector<TestMode> {
    Connector {
        id: ConnectorId(id),
        connected,
        encoders: vec![EncoderId(encoder)],
        modes: vec![
            TestMode::new(1280, 720, 60, false),
            TestMode::new(1920, 1080, 60, true),
        ],
        size_mm: (527, 296),
        name: format!("HDMI-A-{}", id),
    }
}

/// Transport call as seen by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SetCrtc {
        crtc: u32,
        framebuffer: Option<u32>,
        connector: Option<u32>,
    },
    PageFlip {
        crtc: u32,
        framebuffer: u32,
    },
    Wait,
}

/// What the next drain wait does with the in-flight flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Deliver a completion event for every in-flight flip.
    Deliver,
    /// Return without any event.
    Drop,
    /// Fail at the transport level.
    Fail,
    /// Deliver an event addressed to another CRTC.
    Foreign,
    /// The flips land, but their events only show up in a later wait.
    Late,
}

pub struct ScriptedDevice {
    pub connectors: Vec<Connector<TestMode>>,
    pub encoders: Vec<Encoder>,
    pub crtcs: Vec<CrtcId>,
    /// Listed by `resources` ahead of `connectors`, unknown to `connector`.
    missing_connectors: Vec<ConnectorId>,
    calls: RefCell<Vec<Call>>,
    flip_errors: RefCell<VecDeque<Option<i32>>>,
    set_crtc_errors: RefCell<VecDeque<Option<i32>>>,
    waits: RefCell<VecDeque<WaitOutcome>>,
    in_flight: RefCell<Vec<CrtcId>>,
    late: RefCell<Vec<FlipEvent>>,
    max_in_flight: Cell<usize>,
    sequence: Cell<u32>,
}

impl ScriptedDevice {
    /// Connector 1 (connected) → encoder 50 → CRTC 100.
    pub fn single_output() -> Self {
        Self {
            connectors: vec![test_connector(1, true, 50)],
            encoders: vec![Encoder {
                id: EncoderId(50),
                possible_crtcs: CrtcMask(0b1),
            }],
            crtcs: vec![CrtcId(100)],
            missing_connectors: Vec::new(),
            calls: RefCell::new(Vec::new()),
            flip_errors: RefCell::new(VecDeque::new()),
            set_crtc_errors: RefCell::new(VecDeque::new()),
            waits: RefCell::new(VecDeque::new()),
            in_flight: RefCell::new(Vec::new()),
            late: RefCell::new(Vec::new()),
            max_in_flight: Cell::new(0),
            sequence: Cell::new(0),
        }
    }

    pub fn add_connector(&mut self, connector: Connector<TestMode>) {
        self.connectors.push(connector);
    }

    /// Lists a connector id whose lookup fails with `ENOENT`.
    pub fn add_missing_connector(&mut self, id: u32) {
        self.missing_connectors.push(ConnectorId(id));
    }

    pub fn add_encoder(&mut self, id: u32, possible_crtcs: u32) {
        self.encoders.push(Encoder {
            id: EncoderId(id),
            possible_crtcs: CrtcMask(possible_crtcs),
        });
    }

    pub fn reorder_connectors(&mut self, order: &[u32]) {
        self.connectors
            .sort_by_key(|c| order.iter().position(|&id| id == c.id.0).unwrap_or(usize::MAX));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Fails the next page flip with `errno`.
    pub fn fail_next_flip(&self, errno: i32) {
        self.flip_errors.borrow_mut().push_back(Some(errno));
    }

    /// Fails the next mode-set with `errno`.
    pub fn fail_next_set_crtc(&self, errno: i32) {
        self.set_crtc_errors.borrow_mut().push_back(Some(errno));
    }

    /// Scripts the next drain wait. Unscripted waits deliver.
    pub fn next_wait(&self, outcome: WaitOutcome) {
        self.waits.borrow_mut().push_back(outcome);
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.borrow().len()
    }

    /// Highest number of flips the kernel ever had outstanding at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.get()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn event(&self, crtc: CrtcId) -> FlipEvent {
        let sequence = self.sequence.get() + 1;
        self.sequence.set(sequence);
        FlipEvent {
            crtc,
            sequence,
            timestamp: Duration::from_micros(16_667 * u64::from(sequence)),
        }
    }
}

impl KmsDevice for ScriptedDevice {
    type Mode = TestMode;

    fn resources(&self) -> io::Result<Resources> {
        Ok(Resources {
            connectors: self
                .missing_connectors
                .iter()
                .copied()
                .chain(self.connectors.iter().map(|c| c.id))
                .collect(),
            crtcs: self.crtcs.clone(),
        })
    }

    fn connector(&self, id: ConnectorId) -> io::Result<Connector<TestMode>> {
        self.connectors
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| io::Error::from_raw_os_error(libc::ENOENT))
    }

    fn encoder(&self, id: EncoderId) -> io::Result<Encoder> {
        self.encoders
            .iter()
            .find(|e| e.id == id)
            .copied()
            .ok_or_else(|| io::Error::from_raw_os_error(libc::ENOENT))
    }

    fn set_crtc(&self, crtc: CrtcId, binding: Option<CrtcBinding<'_, TestMode>>) -> io::Result<()> {
        self.record(Call::SetCrtc {
            crtc: crtc.0,
            framebuffer: binding.map(|b| b.framebuffer.raw()),
            connector: binding.map(|b| b.connector.0),
        });

        match self.set_crtc_errors.borrow_mut().pop_front().flatten() {
            Some(errno) => Err(io::Error::from_raw_os_error(errno)),
            None => Ok(()),
        }
    }

    fn page_flip(&self, crtc: CrtcId, framebuffer: FramebufferId) -> io::Result<()> {
        self.record(Call::PageFlip {
            crtc: crtc.0,
            framebuffer: framebuffer.raw(),
        });

        if let Some(errno) = self.flip_errors.borrow_mut().pop_front().flatten() {
            return Err(io::Error::from_raw_os_error(errno));
        }

        let mut in_flight = self.in_flight.borrow_mut();
        in_flight.push(crtc);
        self.max_in_flight.set(self.max_in_flight.get().max(in_flight.len()));
        Ok(())
    }

    fn wait_flip_events(&self, _timeout: Option<Duration>) -> io::Result<Vec<FlipEvent>> {
        self.record(Call::Wait);

        let outcome = self.waits.borrow_mut().pop_front().unwrap_or(WaitOutcome::Deliver);
        let flips: Vec<CrtcId> = self.in_flight.borrow_mut().drain(..).collect();

        match outcome {
            WaitOutcome::Deliver => {
                let mut events: Vec<FlipEvent> = self.late.borrow_mut().drain(..).collect();
                events.extend(flips.into_iter().map(|crtc| self.event(crtc)));
                Ok(events)
            }
            WaitOutcome::Drop => Ok(Vec::new()),
            WaitOutcome::Fail => Err(io::Error::from_raw_os_error(libc::EIO)),
            WaitOutcome::Foreign => Ok(vec![self.event(CrtcId(0xdead))]),
            WaitOutcome::Late => {
                let events: Vec<FlipEvent> = flips.into_iter().map(|crtc| self.event(crtc)).collect();
                self.late.borrow_mut().extend(events);
                Ok(Vec::new())
            }
        }
    }
}
