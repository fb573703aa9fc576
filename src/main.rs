#![no_std]
#![no_main]
#![deny(unused_must_use)]

use core::cell::RefCell;

use embassy_executor::Spawner;
use embassy_time::{Delay, Duration, Ticker, Timer};
use embedded_hal_bus::i2c::RefCellDevice;
use esp_backtrace as _;
use esp_hal::{
    clock::CpuClock,
    i2c::master::{Config as I2cConfig, I2c},
    time::Rate,
    timer::systimer::SystemTimer,
    Blocking,
};
use log::{debug, error, info, warn};

use gy80_ahrs::{
    gy80::{adxl345::Adxl345, bmp085::Bmp085, hmc5883l::Hmc5883l, l3g4200d::L3G4200D},
    EmbassyClock, FusionConfig, Gy80, ImuSensor,
};

macro_rules! mk_static {
    ($t:ty,$val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write(($val));
        x
    }};
}

type I2cBus = I2c<'static, Blocking>;
type I2cDev = RefCellDevice<'static, I2cBus>;

type Board = Gy80<
    Adxl345<I2cDev>,
    L3G4200D<I2cDev>,
    Hmc5883l<I2cDev>,
    Bmp085<I2cDev>,
    EmbassyClock,
>;

/// Gyroscope error bound, deg/s
const GYRO_MEAS_ERROR_DEG: f32 = 40.0;

/// Magnetic declination at the site, deg
// TODO: take from a GPS fix once the board has one
const DECLINATION_DEG: f32 = 10.0;

const FUSION: FusionConfig = FusionConfig::new(GYRO_MEAS_ERROR_DEG, DECLINATION_DEG);

const TICK: Duration = Duration::from_millis(10);

#[embassy_executor::task]
async fn imu_task(mut board: Board) {
    if let Err(err) = board.init(&mut Delay) {
        error!(
            "GY-80 init failed with code {} ({:?}): {err:?}",
            err.code(),
            err.sensor()
        );
        loop {
            Timer::after_secs(10_000).await;
        }
    }

    let mut ticker = Ticker::every(TICK);
    let mut ticks: u32 = 0;
    let mut baro = None;
    loop {
        ticker.next().await;
        ticks = ticks.wrapping_add(1);

        // once a second
        let report = ticks % 100 == 0;

        match board.sense() {
            Ok(rotation) if report => info!(
                "yaw {:.1} pitch {:.1} roll {:.1}",
                rotation.yaw, rotation.pitch, rotation.roll
            ),
            Ok(_) => {}
            Err(err) => debug!("Sensors not ready: {err:?}"),
        }

        match board.barometer().measure() {
            Ok(sample) => baro = Some(sample),
            Err(nb::Error::WouldBlock) => {}
            Err(nb::Error::Other(err)) if report => warn!("Barometer read failed: {err:?}"),
            Err(nb::Error::Other(err)) => debug!("Barometer read failed: {err:?}"),
        }

        if report {
            if let Some(sample) = baro.take() {
                info!(
                    "{:.1}C {:.0}Pa altitude {:.1}m",
                    sample.x, sample.y, sample.z
                );
            }
        }
    }
}

#[esp_hal_embassy::main]
async fn main(spawner: Spawner) -> ! {
    esp_println::logger::init_logger_from_env();
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    let systimer = SystemTimer::new(peripherals.SYSTIMER);
    esp_hal_embassy::init(systimer.alarm0);

    let i2c = I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(400)),
    )
    .unwrap()
    .with_scl(peripherals.GPIO21)
    .with_sda(peripherals.GPIO20);

    let i2c_bus = mk_static!(RefCell<I2cBus>, RefCell::new(i2c));

    let board = Gy80::new(
        Adxl345::new(RefCellDevice::new(i2c_bus)),
        L3G4200D::new(RefCellDevice::new(i2c_bus)),
        Hmc5883l::new(RefCellDevice::new(i2c_bus)),
        Bmp085::new(RefCellDevice::new(i2c_bus)),
        EmbassyClock,
        FUSION,
    );

    info!("Starting GY-80 at {} Hz", 1000 / TICK.as_millis());
    spawner.must_spawn(imu_task(board));

    loop {
        Timer::after_secs(10_000).await;
    }
}
