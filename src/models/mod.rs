pub mod device;
pub mod energy;

pub use device::{Circuit, CircuitSeed, NewDevice};
pub use energy::{BillingRate, CircuitDayCost, DailyRollup, HourlyRollup, NewReading};
