//! Application services

mod availability;
mod booking;
mod pricing;
mod refund;
mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

pub use availability::{AvailabilityService, AvailableRoom};
pub use booking::{BookingService, CancelOutcome, CreateBooking};
pub use pricing::{
    AppliedDiscount, ItemRequest, PricedItem, PricedLines, PricedService, PricingService, Quote,
    QuoteRequest, ServiceRequest,
};
pub use refund::{OpenRefund, RefundService};
pub use scheduler::{
    match_rule, RuleStats, SchedulerConfig, StayScheduler, SweepFailure, SweepReport, SweepRule,
};
