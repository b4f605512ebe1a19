pub mod cancel;
pub mod io_pin_wapper;
pub mod line;
pub mod sched;
pub mod sensor;
pub mod std_clock;
pub mod watchdog;
