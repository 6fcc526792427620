use crate::status;
use crate::telemetry;

#[embassy_executor::task]
pub async fn run() -> ! {
    loop {
        let snapshot = status::next().await;
        telemetry::log_status(&snapshot);
    }
}
