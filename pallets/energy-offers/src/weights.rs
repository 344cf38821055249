//! Energy offers weight stubs.
//!
//! Placeholder weights until the benchmarks in `benchmarking.rs` are run
//! against a reference machine.

use frame_support::weights::Weight;

pub trait WeightInfo {
    // Offer lifecycle
    fn create_offer() -> Weight;
    fn update_offer() -> Weight;
    fn cancel_offer() -> Weight;
    fn moderate_offer() -> Weight;

    // Negotiation
    fn add_negotiation_message() -> Weight;
    fn accept_negotiation() -> Weight;
    fn cancel_negotiation() -> Weight;
}

impl WeightInfo for () {
    fn create_offer() -> Weight {
        Weight::from_parts(10_000, 0)
    }

    fn update_offer() -> Weight {
        Weight::from_parts(10_000, 0)
    }

    fn cancel_offer() -> Weight {
        Weight::from_parts(10_000, 0)
    }

    fn moderate_offer() -> Weight {
        Weight::from_parts(10_000, 0)
    }

    fn add_negotiation_message() -> Weight {
        Weight::from_parts(10_000, 0)
    }

    // Scans the negotiation log for the latest counter-proposal.
    fn accept_negotiation() -> Weight {
        Weight::from_parts(25_000, 0)
    }

    fn cancel_negotiation() -> Weight {
        Weight::from_parts(10_000, 0)
    }
}
