pub mod locks;
pub mod services;

// Re-export key types for convenience
pub use locks::{LockKey, LockRegistry, LockSet};
pub use services::{
    AvailabilityService, AvailableRoom, BookingService, CancelOutcome, CreateBooking, ItemRequest,
    OpenRefund, PricingService, QuoteRequest, RefundService, SchedulerConfig, ServiceRequest,
    StayScheduler, SweepReport,
};
