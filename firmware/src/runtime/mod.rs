use core::cell::RefCell;

use cortex_m::register::primask;
use critical_section::{self, Mutex, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::adc::Adc;
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_stm32::peripherals::TIM2;
use embassy_stm32::time::Hertz;
use embassy_stm32::timer::low_level::Timer as HwTimer;
use lilbot_core::clock::{DutyCycles, MotorDriver, MotorPolarity, TickClock, TickEngine};
use lilbot_core::config::ControlConfig;
use lilbot_core::control::LineFollower;

use crate::hw::{AdcSensors, MotorPins};
use crate::telemetry;

mod control_task;
mod diagnostics_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        cortex_m::interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                cortex_m::interrupt::enable();
            }
        }
    }
}

const CONFIG: ControlConfig = ControlConfig::new();

pub(super) static CLOCK: TickClock = TickClock::new(CONFIG.clock.tick_hz);
pub(super) static DUTY: DutyCycles = DutyCycles::new();

/// Everything the tick interrupt owns.
struct TickContext {
    timer: HwTimer<'static, TIM2>,
    engine: TickEngine<'static>,
    motors: MotorPins,
}

static TICK: Mutex<RefCell<Option<TickContext>>> = Mutex::new(RefCell::new(None));

#[interrupt]
fn TIM2() {
    critical_section::with(|cs| {
        if let Some(context) = TICK.borrow_ref_mut(cs).as_mut() {
            context.timer.clear_update_interrupt();
            let levels = context.engine.tick(&DUTY);
            context.motors.apply(levels);
        }
    });
}

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        ADC1,
        PA0,
        PA1,
        PA2,
        PA3,
        PB4,
        PB5,
        TIM2,
        ..
    } = hal::init(config);

    let follower = match LineFollower::for_clock(CONFIG, &CLOCK) {
        Ok(follower) => follower,
        Err(error) => {
            telemetry::log_config_error(&error);
            core::future::pending::<()>().await;
            return;
        }
    };

    let mut motors = MotorPins::new(PB4, PB5, MotorPolarity::ActiveLow);
    motors.stop();
    let sensors = AdcSensors::new(Adc::new(ADC1), PA0, PA1, PA2, PA3);

    let engine = CLOCK.take_engine().expect("tick engine already claimed");
    let duty = DUTY.take_writer().expect("duty writer already claimed");

    let timer = HwTimer::new(TIM2);
    timer.set_frequency(Hertz::hz(CLOCK.ticks_per_second()));
    timer.enable_update_interrupt(true);
    critical_section::with(|cs| {
        *TICK.borrow_ref_mut(cs) = Some(TickContext {
            timer,
            engine,
            motors,
        });
    });

    interrupt::TIM2.set_priority(Priority::P0);
    unsafe {
        interrupt::TIM2.enable();
    }
    critical_section::with(|cs| {
        if let Some(context) = TICK.borrow_ref(cs).as_ref() {
            context.timer.start();
        }
    });

    spawner
        .spawn(control_task::run(follower, sensors, duty))
        .expect("failed to spawn control task");

    spawner
        .spawn(diagnostics_task::run())
        .expect("failed to spawn diagnostics task");

    core::future::pending::<()>().await;
}
