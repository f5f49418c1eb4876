use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
use tfmini_plus_i2c::{BoardBuses, BusId, BusPins, BusRecovery, FlexPin, PinError, RecoveryTiming};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line {
    Sda(u8),
    Scl(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Output(Line),
    Input(Line),
    High(Line),
    Low(Line),
    Reinit(BusId),
}

type Log = Rc<RefCell<Vec<Event>>>;

struct RecordingPin {
    line: Line,
    log: Log,
}

impl ErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(Event::Low(self.line));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(Event::High(self.line));
        Ok(())
    }
}

impl FlexPin for RecordingPin {
    fn set_as_output(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(Event::Output(self.line));
        Ok(())
    }

    fn set_as_input(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(Event::Input(self.line));
        Ok(())
    }
}

struct BrokenPin;

impl ErrorType for BrokenPin {
    type Error = ErrorKind;
}

impl OutputPin for BrokenPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Err(ErrorKind::Other)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Err(ErrorKind::Other)
    }
}

impl FlexPin for BrokenPin {
    fn set_as_output(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_as_input(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

// Records like `RecordingPin` but fails the `set_high` call number `fail_at`.
struct FlakyPin {
    pin: RecordingPin,
    highs: usize,
    fail_at: usize,
}

impl ErrorType for FlakyPin {
    type Error = ErrorKind;
}

impl OutputPin for FlakyPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.pin.set_low().unwrap();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.highs += 1;
        if self.highs == self.fail_at {
            return Err(ErrorKind::Other);
        }
        self.pin.set_high().unwrap();
        Ok(())
    }
}

impl FlexPin for FlakyPin {
    fn set_as_output(&mut self) -> Result<(), Self::Error> {
        self.pin.set_as_output().unwrap();
        Ok(())
    }

    fn set_as_input(&mut self) -> Result<(), Self::Error> {
        self.pin.set_as_input().unwrap();
        Ok(())
    }
}

#[derive(Default)]
struct CountingDelay {
    total_ns: u64,
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

fn bus(index: u8, log: &Log) -> BusPins<RecordingPin, RecordingPin> {
    BusPins {
        sda: RecordingPin {
            line: Line::Sda(index),
            log: log.clone(),
        },
        scl: RecordingPin {
            line: Line::Scl(index),
            log: log.clone(),
        },
    }
}

fn count(log: &[Event], event: Event) -> usize {
    log.iter().filter(|&&e| e == event).count()
}

#[test]
fn clocks_ten_pulses_then_stops_and_releases() {
    let log = Log::default();
    let BusPins { mut sda, mut scl } = bus(0, &log);
    let mut recovery = BusRecovery::new(CountingDelay::default());

    recovery
        .recover_bus(&mut sda, &mut scl, || {
            log.borrow_mut().push(Event::Reinit(BusId::Primary));
        })
        .unwrap();

    let log = log.borrow();
    let (sda, scl) = (Line::Sda(0), Line::Scl(0));
    assert_eq!(
        &log[..3],
        &[Event::Output(sda), Event::High(sda), Event::Output(scl)]
    );
    // ten pulses, plus the clock rise of the stop condition
    assert_eq!(count(&log, Event::Low(scl)), 10);
    assert_eq!(count(&log, Event::High(scl)), 11);
    for pulse in log[3..23].chunks(2) {
        assert_eq!(pulse, &[Event::High(scl), Event::Low(scl)]);
    }
    assert_eq!(
        &log[23..],
        &[
            Event::Low(sda),
            Event::High(scl),
            Event::High(sda),
            Event::Input(sda),
            Event::Input(scl),
            Event::Reinit(BusId::Primary),
        ]
    );

    // 10 * (5 + 5) + 5 + 2 + 2 microseconds
    assert_eq!(recovery.release().total_ns, 109_000);
}

#[test]
fn custom_timing_changes_pulse_count() {
    let log = Log::default();
    let BusPins { mut sda, mut scl } = bus(0, &log);
    let timing = RecoveryTiming::default().pulses(9).pulse_us(10);
    let mut recovery = BusRecovery::with_timing(CountingDelay::default(), timing);

    recovery.recover_bus(&mut sda, &mut scl, || {}).unwrap();

    assert_eq!(count(&log.borrow(), Event::Low(Line::Scl(0))), 9);
    assert_eq!(recovery.release().total_ns, (9 * 20 + 5 + 2 + 2) * 1_000);
}

#[test]
fn recovers_both_buses_in_order() {
    let log = Log::default();
    let mut board = BoardBuses {
        primary: bus(0, &log),
        secondary: Some(bus(1, &log)),
    };
    let mut recovery = BusRecovery::new(CountingDelay::default());

    let reinit_log = log.clone();
    recovery
        .recover_default_buses(&mut board, |id| {
            reinit_log.borrow_mut().push(Event::Reinit(id));
        })
        .unwrap();

    let log = log.borrow();
    let reinits: Vec<_> = log
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, Event::Reinit(_)))
        .collect();
    assert_eq!(reinits.len(), 2);
    assert_eq!(*reinits[0].1, Event::Reinit(BusId::Primary));
    assert_eq!(*reinits[1].1, Event::Reinit(BusId::Secondary));
    assert!(log[..reinits[0].0]
        .iter()
        .all(|e| !matches!(e, Event::High(Line::Scl(1)) | Event::Low(Line::Scl(1)))));
    assert_eq!(count(&log, Event::Low(Line::Scl(1))), 10);
    assert_eq!(log.last(), Some(&Event::Reinit(BusId::Secondary)));
}

#[test]
fn single_bus_board_skips_the_second_bus() {
    let log = Log::default();
    let mut board = BoardBuses {
        primary: bus(0, &log),
        secondary: None,
    };
    let mut recovery = BusRecovery::new(CountingDelay::default());
    let mut calls = Vec::new();

    recovery
        .recover_default_buses(&mut board, |id| calls.push(id))
        .unwrap();

    assert_eq!(calls, vec![BusId::Primary]);
}

#[test]
fn pin_failure_aborts_before_reinit() {
    let log = Log::default();
    let BusPins { mut sda, .. } = bus(0, &log);
    let mut scl = BrokenPin;
    let mut recovery = BusRecovery::new(CountingDelay::default());
    let mut reinit_called = false;

    let result = recovery.recover_bus(&mut sda, &mut scl, || reinit_called = true);

    assert_eq!(result, Err(PinError::Clock(ErrorKind::Other)));
    assert!(!reinit_called);
}

#[test]
fn failed_stop_still_releases_both_lines() {
    let log = Log::default();
    let BusPins { sda, mut scl } = bus(0, &log);
    // the second data rise is the end of the STOP condition
    let mut sda = FlakyPin {
        pin: sda,
        highs: 0,
        fail_at: 2,
    };
    let mut recovery = BusRecovery::new(CountingDelay::default());
    let mut reinit_called = false;

    let result = recovery.recover_bus(&mut sda, &mut scl, || reinit_called = true);

    assert_eq!(result, Err(PinError::Data(ErrorKind::Other)));
    assert!(!reinit_called);
    let log = log.borrow();
    assert_eq!(
        &log[log.len() - 4..],
        &[
            Event::Low(Line::Sda(0)),
            Event::High(Line::Scl(0)),
            Event::Input(Line::Sda(0)),
            Event::Input(Line::Scl(0)),
        ]
    );
}

#[test]
fn broken_clock_still_releases_the_data_line() {
    let log = Log::default();
    let BusPins { mut sda, .. } = bus(0, &log);
    let mut scl = BrokenPin;
    let mut recovery = BusRecovery::new(CountingDelay::default());

    let result = recovery.recover_bus(&mut sda, &mut scl, || {});

    assert_eq!(result, Err(PinError::Clock(ErrorKind::Other)));
    assert_eq!(log.borrow().last(), Some(&Event::Input(Line::Sda(0))));
}
