//! Energy offers pallet benchmarks.

#![cfg(feature = "runtime-benchmarks")]

use super::*;
use alloc::vec;
use frame_benchmarking::v2::*;
use frame_support::traits::Get;
use frame_system::RawOrigin;
use pallet_market_roles::{Role, RoleGate};

fn trader<T: Config>(name: &'static str) -> T::AccountId {
    let who: T::AccountId = account(name, 0, 0);
    T::Roles::set_role(&who, Role::User);
    who
}

fn delivery_window<T: Config>() -> (u64, u64) {
    let now = Pallet::<T>::now();
    (now.saturating_add(3_600), now.saturating_add(7_200))
}

/// Lists a 100-unit sell offer for `creator` and returns its id.
fn seed_offer<T: Config>(creator: &T::AccountId) -> Result<OfferId, BenchmarkError> {
    let (start, end) = delivery_window::<T>();
    Pallet::<T>::create_offer(
        RawOrigin::Signed(creator.clone()).into(),
        Direction::Sell,
        100,
        5u32.into(),
        start,
        end,
    )?;
    Pallet::<T>::offers_of(creator)
        .last()
        .copied()
        .ok_or(BenchmarkError::Stop("offer was not indexed"))
}

/// Fills the negotiation log to capacity, ending with a counter-proposal.
fn fill_negotiation<T: Config>(
    offer_id: OfferId,
    counterparty: &T::AccountId,
) -> Result<(), BenchmarkError> {
    let note = vec![b'n'; T::MaxNoteLength::get() as usize];
    for _ in 0..T::MaxNegotiationMessages::get() {
        Pallet::<T>::add_negotiation_message(
            RawOrigin::Signed(counterparty.clone()).into(),
            offer_id,
            note.clone(),
            4u32.into(),
            120,
        )?;
    }
    Ok(())
}

#[benchmarks]
mod benchmarks {
    use super::*;

    #[benchmark]
    fn create_offer() -> Result<(), BenchmarkError> {
        let creator = trader::<T>("creator");
        let (start, end) = delivery_window::<T>();

        #[extrinsic_call]
        _(
            RawOrigin::Signed(creator.clone()),
            Direction::Sell,
            100,
            5u32.into(),
            start,
            end,
        );

        assert_eq!(Pallet::<T>::offers_of(&creator).len(), 1);
        Ok(())
    }

    #[benchmark]
    fn update_offer() -> Result<(), BenchmarkError> {
        let creator = trader::<T>("creator");
        let offer_id = seed_offer::<T>(&creator)?;
        let (start, end) = delivery_window::<T>();

        #[extrinsic_call]
        _(
            RawOrigin::Signed(creator),
            offer_id,
            200,
            6u32.into(),
            start,
            end,
        );

        Ok(())
    }

    #[benchmark]
    fn add_negotiation_message() -> Result<(), BenchmarkError> {
        let creator = trader::<T>("creator");
        let counterparty = trader::<T>("counterparty");
        let offer_id = seed_offer::<T>(&creator)?;
        let note = vec![b'n'; T::MaxNoteLength::get() as usize];

        #[extrinsic_call]
        _(
            RawOrigin::Signed(counterparty),
            offer_id,
            note,
            4u32.into(),
            120,
        );

        assert_eq!(
            Offers::<T>::get(offer_id).map(|o| o.status),
            Some(OfferStatus::Negotiating)
        );
        Ok(())
    }

    #[benchmark]
    fn accept_negotiation() -> Result<(), BenchmarkError> {
        let creator = trader::<T>("creator");
        let counterparty = trader::<T>("counterparty");
        let offer_id = seed_offer::<T>(&creator)?;
        fill_negotiation::<T>(offer_id, &counterparty)?;

        #[extrinsic_call]
        _(RawOrigin::Signed(creator), offer_id);

        assert_eq!(
            Offers::<T>::get(offer_id).map(|o| o.status),
            Some(OfferStatus::Agreed)
        );
        Ok(())
    }

    #[benchmark]
    fn cancel_negotiation() -> Result<(), BenchmarkError> {
        let creator = trader::<T>("creator");
        let counterparty = trader::<T>("counterparty");
        let offer_id = seed_offer::<T>(&creator)?;
        fill_negotiation::<T>(offer_id, &counterparty)?;

        #[extrinsic_call]
        _(RawOrigin::Signed(creator), offer_id);

        Ok(())
    }

    #[benchmark]
    fn cancel_offer() -> Result<(), BenchmarkError> {
        let creator = trader::<T>("creator");
        let offer_id = seed_offer::<T>(&creator)?;

        #[extrinsic_call]
        _(RawOrigin::Signed(creator), offer_id);

        assert!(!Pallet::<T>::is_listed(&offer_id));
        Ok(())
    }

    #[benchmark]
    fn moderate_offer() -> Result<(), BenchmarkError> {
        let creator = trader::<T>("creator");
        let offer_id = seed_offer::<T>(&creator)?;
        let moderator: T::AccountId = account("moderator", 0, 0);
        T::Roles::set_role(&moderator, Role::Moderator);

        #[extrinsic_call]
        _(RawOrigin::Signed(moderator), offer_id);

        assert!(!Pallet::<T>::is_listed(&offer_id));
        Ok(())
    }

    impl_benchmark_test_suite!(Pallet, crate::mock::new_test_ext(), crate::mock::Test);
}
