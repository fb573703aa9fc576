use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use embedded_hal::delay::DelayNs;
use gy80_ahrs::{
    math::{PI_180, RAD_TO_DEG},
    Clock, FusionConfig, Gy80, ImuSensor, InitError, SenseError, Sensor,
};
use nalgebra::Vector3;

const DT_MICROS: u32 = 10_000;
const DECLINATION: f32 = 10.0;

#[derive(Debug, PartialEq)]
struct FakeError;

/// Sensor whose next sample is set from the test. `None` reads as not ready.
#[derive(Clone, Default)]
struct Scripted {
    sample: Rc<RefCell<Option<Vector3<f32>>>>,
    broken: Rc<Cell<bool>>,
}

impl Scripted {
    fn set(&self, sample: Option<Vector3<f32>>) {
        *self.sample.borrow_mut() = sample;
    }
}

impl ImuSensor for Scripted {
    type Error = FakeError;

    fn init<D: DelayNs>(&mut self, _delay: &mut D) -> Result<(), Self::Error> {
        if self.broken.get() {
            Err(FakeError)
        } else {
            Ok(())
        }
    }

    fn measure(&mut self) -> nb::Result<Vector3<f32>, Self::Error> {
        (*self.sample.borrow()).ok_or(nb::Error::WouldBlock)
    }
}

#[derive(Clone, Default)]
struct ManualClock(Rc<Cell<u32>>);

impl ManualClock {
    fn advance(&self, micros: u32) {
        self.0.set(self.0.get().wrapping_add(micros));
    }
}

impl Clock for ManualClock {
    fn now_micros(&mut self) -> u32 {
        self.0.get()
    }
}

struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

struct Rig {
    accel: Scripted,
    gyro: Scripted,
    mag: Scripted,
    baro: Scripted,
    clock: ManualClock,
    board: Gy80<Scripted, Scripted, Scripted, Scripted, ManualClock>,
}

fn rig(start_micros: u32) -> Rig {
    let (accel, gyro, mag, baro) = Default::default();
    let clock = ManualClock::default();
    clock.0.set(start_micros);
    let board = Gy80::new(
        Scripted::clone(&accel),
        Scripted::clone(&gyro),
        Scripted::clone(&mag),
        Scripted::clone(&baro),
        clock.clone(),
        FusionConfig::new(40.0, DECLINATION),
    );
    Rig {
        accel,
        gyro,
        mag,
        baro,
        clock,
        board,
    }
}

impl Rig {
    fn feed(&self, accel: Vector3<f32>, gyro: Vector3<f32>, mag: Option<Vector3<f32>>) {
        self.accel.set(Some(accel));
        self.gyro.set(Some(gyro));
        self.mag.set(mag);
        self.clock.advance(DT_MICROS);
    }
}

fn assert_close(a: f32, b: f32, tol: f32) {
    assert!((a - b).abs() < tol, "{a} != {b} (tolerance {tol})");
}

/// Yaw after one tick of `gz` rad/s with a field along x and the board level
fn spun_yaw(gz: f32, dt: f32) -> f32 {
    gz * dt * RAD_TO_DEG - DECLINATION
}

#[test]
fn init_reports_first_failing_sensor() {
    let mut rig = rig(0);

    rig.gyro.broken.set(true);
    rig.mag.broken.set(true);
    let err = rig.board.init(&mut NoDelay).unwrap_err();
    assert_eq!(err.sensor(), Sensor::Gyroscope);
    assert_eq!(err.code(), -2);
    assert!(matches!(err, InitError::Gyroscope(FakeError)));

    rig.gyro.broken.set(false);
    let err = rig.board.init(&mut NoDelay).unwrap_err();
    assert_eq!(err.code(), -3);

    rig.mag.broken.set(false);
    rig.baro.broken.set(true);
    assert_eq!(rig.board.init(&mut NoDelay).unwrap_err().code(), -4);

    rig.baro.broken.set(false);
    rig.board.init(&mut NoDelay).unwrap();
}

#[test]
fn missing_accel_or_gyro_fails_the_tick() {
    let mut rig = rig(0);
    rig.board.init(&mut NoDelay).unwrap();

    rig.feed(Vector3::z(), Vector3::zeros(), None);
    rig.accel.set(None);
    assert_eq!(
        rig.board.sense(),
        Err(SenseError {
            accel: true,
            gyro: false,
            mag: true
        })
    );

    rig.feed(Vector3::z(), Vector3::zeros(), Some(Vector3::x()));
    rig.gyro.set(None);
    assert_eq!(
        rig.board.sense(),
        Err(SenseError {
            accel: false,
            gyro: true,
            mag: false
        })
    );

    // nothing reached the filter
    assert_eq!(
        *rig.board.filter().quaternion(),
        nalgebra::Vector4::new(1.0, 0.0, 0.0, 0.0)
    );
}

#[test]
fn missing_mag_holds_attitude() {
    let mut rig = rig(0);
    rig.board.init(&mut NoDelay).unwrap();

    let roll = 30.0 * PI_180;
    let (s, c) = (roll.sin(), roll.cos());
    let accel = Vector3::new(0.0, s, c);
    let mag = Vector3::new(0.38, 0.92 * s, 0.92 * c);

    let mut last = None;
    for _ in 0..1_000 {
        rig.feed(accel, Vector3::zeros(), Some(mag));
        last = Some(rig.board.sense().unwrap());
    }
    let converged = last.unwrap();
    assert_close(converged.roll, 30.0, 1.5);
    let q = *rig.board.filter().quaternion();

    // spinning hard, but without a field sample nothing moves
    rig.feed(accel, Vector3::new(2.0, -1.0, 3.0), None);
    let held = rig.board.sense().unwrap();

    assert_eq!(held, converged);
    assert_eq!(*rig.board.filter().quaternion(), q);
}

#[test]
fn failed_tick_consumes_its_interval() {
    let mut rig = rig(0);
    rig.board.init(&mut NoDelay).unwrap();

    rig.feed(Vector3::z(), Vector3::new(0.0, 0.0, 0.5), Some(Vector3::x()));
    rig.accel.set(None);
    assert!(rig.board.sense().is_err());

    rig.feed(Vector3::z(), Vector3::new(0.0, 0.0, 0.5), Some(Vector3::x()));
    let rotation = rig.board.sense().unwrap();

    // one interval integrated, not two
    assert_close(rotation.yaw, spun_yaw(0.5, 0.01), 1e-3);
}

#[test]
fn clock_wrap_gives_short_interval() {
    let mut rig = rig(u32::MAX - (DT_MICROS / 2 - 1));
    rig.board.init(&mut NoDelay).unwrap();

    rig.feed(Vector3::z(), Vector3::new(0.0, 0.0, 0.5), Some(Vector3::x()));
    assert!(rig.clock.0.get() < DT_MICROS);
    let rotation = rig.board.sense().unwrap();

    assert_close(rotation.yaw, spun_yaw(0.5, 0.01), 1e-3);
    assert_close(rotation.pitch, 0.0, 1e-4);
    assert_close(rotation.roll, 0.0, 1e-4);
}

#[test]
fn barometer_is_reachable() {
    let mut rig = rig(0);
    rig.board.init(&mut NoDelay).unwrap();

    rig.baro.set(Some(Vector3::new(15.0, 69_964.0, 3_016.7)));
    let sample = rig.board.barometer().measure().unwrap();
    assert_eq!(sample.y, 69_964.0);
}
