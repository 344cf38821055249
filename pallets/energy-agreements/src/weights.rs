//! Energy agreements weight stubs.

use frame_support::weights::Weight;

pub trait WeightInfo {
    // Formation & funding
    fn create_agreement() -> Weight;
    fn fund_agreement() -> Weight;
    fn cancel_unfunded_agreement() -> Weight;

    // Delivery
    fn start_energy_transfer() -> Weight;
    fn report_energy_delivery() -> Weight;
    fn finalize_milestone() -> Weight;

    // Disputes
    fn dispute_milestone() -> Weight;
    fn dispute_and_refund() -> Weight;
    fn resolve_dispute() -> Weight;
}

// Placeholder until the pallet is benchmarked; calls that move value weigh more.
impl WeightInfo for () {
    fn create_agreement() -> Weight {
        Weight::from_parts(10_000, 0)
    }

    fn fund_agreement() -> Weight {
        Weight::from_parts(20_000, 0)
    }

    fn cancel_unfunded_agreement() -> Weight {
        Weight::from_parts(10_000, 0)
    }

    fn start_energy_transfer() -> Weight {
        Weight::from_parts(10_000, 0)
    }

    fn report_energy_delivery() -> Weight {
        Weight::from_parts(20_000, 0)
    }

    fn finalize_milestone() -> Weight {
        Weight::from_parts(10_000, 0)
    }

    fn dispute_milestone() -> Weight {
        Weight::from_parts(10_000, 0)
    }

    fn dispute_and_refund() -> Weight {
        Weight::from_parts(20_000, 0)
    }

    fn resolve_dispute() -> Weight {
        Weight::from_parts(20_000, 0)
    }
}
