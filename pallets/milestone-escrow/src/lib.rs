//! # Milestone Escrow Pallet
//!
//! Locked-value ledger backing energy agreements.
//!
//! ## Overview
//!
//! An escrow holds the full agreed total up-front and pays it out to the seller in
//! four equal tranches (25/50/75/100%) as delivery is attested:
//!
//! 1. `create` records buyer, seller, quantity and total. No value moves.
//! 2. The orchestrator moves the total into the pallet holder account, then calls
//!    `start`, which checks the holder really carries the funds.
//! 3. `release_payment` pays one tranche (`total / 4`) per milestone, in strict order.
//!    The 100% tranche closes the escrow and returns any rounding remainder to the buyer.
//! 4. `process_refund` returns whatever is still locked to the buyer and closes the escrow.
//!
//! The pallet exposes no dispatchable calls. It is driven exclusively through the
//! [`EscrowLedger`] trait by the agreement orchestrator.
//!
//! Every money-moving operation mutates storage first and transfers second, inside
//! its own storage layer: a failed transfer discards the mutation with it.

#![cfg_attr(not(feature = "std"), no_std)]
#![allow(deprecated, clippy::let_unit_value)]

pub use pallet::*;

mod milestone;
pub use milestone::{Milestone, MilestoneSet};

#[cfg(test)]
mod mock;

use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use sp_runtime::{DispatchError, DispatchResult, RuntimeDebug};

const LOG_TARGET: &str = "runtime::milestone-escrow";

pub type EscrowId = u64;

#[derive(
    Clone,
    Copy,
    Encode,
    Decode,
    DecodeWithMemTracking,
    Eq,
    PartialEq,
    RuntimeDebug,
    TypeInfo,
    MaxEncodedLen,
)]
pub enum EscrowState {
    /// Recorded, not yet backed by funds.
    Created,
    /// Funded; tranches may be released.
    Active,
    /// All four tranches paid out.
    Released,
    /// Remaining balance returned to the buyer.
    Refunded,
    /// Dropped before it was ever funded.
    Discarded,
}

#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
pub struct EscrowRecord<AccountId, Balance> {
    pub id: EscrowId,
    pub buyer: AccountId,
    pub seller: AccountId,
    pub quantity: u64,
    pub total: Balance,
    pub released: Balance,
    pub state: EscrowState,
    pub released_milestones: MilestoneSet,
}

impl<AccountId, Balance> EscrowRecord<AccountId, Balance> {
    pub fn is_active(&self) -> bool {
        self.state == EscrowState::Active
    }
}

/// Escrow operations available to the agreement orchestrator.
pub trait EscrowLedger<AccountId, Balance> {
    /// Account that physically holds every escrowed balance.
    fn holder() -> AccountId;

    fn create(
        buyer: &AccountId,
        seller: &AccountId,
        quantity: u64,
        total: Balance,
    ) -> Result<EscrowId, DispatchError>;

    /// Activate a created escrow once its total has reached the holder.
    fn start(escrow_id: EscrowId) -> DispatchResult;

    /// Pay the seller the tranche gated by `milestone`. Returns the amount paid.
    fn release_payment(escrow_id: EscrowId, milestone: Milestone) -> Result<Balance, DispatchError>;

    /// Return everything still locked to the buyer. Returns the amount refunded.
    fn process_refund(escrow_id: EscrowId) -> Result<Balance, DispatchError>;

    /// Drop an escrow that was never funded.
    fn discard(escrow_id: EscrowId) -> DispatchResult;

    fn details(escrow_id: EscrowId) -> Option<EscrowRecord<AccountId, Balance>>;

    fn is_milestone_released(escrow_id: EscrowId, milestone: Milestone) -> bool;
}

#[frame_support::pallet]
pub mod pallet {
    use super::*;
    use frame_support::{
        pallet_prelude::*,
        storage::with_storage_layer,
        traits::{Currency, ExistenceRequirement},
        PalletId,
    };
    use sp_runtime::traits::{AccountIdConversion, CheckedAdd, CheckedSub, Saturating, Zero};

    pub type BalanceOf<T> =
        <<T as Config>::Currency as Currency<<T as frame_system::Config>::AccountId>>::Balance;

    pub type EscrowOf<T> = EscrowRecord<<T as frame_system::Config>::AccountId, BalanceOf<T>>;

    #[pallet::config]
    pub trait Config: frame_system::Config {
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        type Currency: Currency<Self::AccountId>;

        /// Derives the holder account.
        #[pallet::constant]
        type PalletId: Get<PalletId>;
    }

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    // =========================================================
    // Storage
    // =========================================================

    #[pallet::storage]
    pub type Escrows<T: Config> = StorageMap<_, Blake2_128Concat, EscrowId, EscrowOf<T>, OptionQuery>;

    #[pallet::storage]
    pub type EscrowCount<T: Config> = StorageValue<_, EscrowId, ValueQuery>;

    /// Outstanding (total - released) balance of every active escrow.
    #[pallet::storage]
    pub type TotalLocked<T: Config> = StorageValue<_, BalanceOf<T>, ValueQuery>;

    // =========================================================
    // Events
    // =========================================================

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        EscrowCreated {
            escrow_id: EscrowId,
            buyer: T::AccountId,
            seller: T::AccountId,
            total: BalanceOf<T>,
        },
        EscrowStarted {
            escrow_id: EscrowId,
        },
        PaymentReleased {
            escrow_id: EscrowId,
            milestone: Milestone,
            amount: BalanceOf<T>,
        },
        EscrowRefunded {
            escrow_id: EscrowId,
            amount: BalanceOf<T>,
        },
        /// Final tranche paid; `remainder` went back to the buyer.
        EscrowClosed {
            escrow_id: EscrowId,
            remainder: BalanceOf<T>,
        },
        EscrowDiscarded {
            escrow_id: EscrowId,
        },
    }

    // =========================================================
    // Errors
    // =========================================================

    #[pallet::error]
    pub enum Error<T> {
        // validation
        ZeroQuantity,
        // state
        EscrowNotFound,
        EscrowNotActive,
        /// Only a freshly created escrow may be started or discarded.
        EscrowNotPending,
        MilestoneAlreadyReleased,
        /// The preceding milestone has not been released yet.
        MilestoneOutOfOrder,
        ReleaseExceedsTotal,
        // external dependency
        /// Holder balance does not cover every active escrow plus this one.
        EscrowUnderfunded,
        PayoutFailed,
        RefundFailed,
        ArithmeticOverflow,
    }

    // =========================================================
    // Internal helpers
    // =========================================================

    impl<T: Config> Pallet<T> {
        pub fn account_id() -> T::AccountId {
            T::PalletId::get().into_account_truncating()
        }

        fn tranche(total: BalanceOf<T>) -> BalanceOf<T> {
            total / 4u32.into()
        }

        fn do_create(
            buyer: &T::AccountId,
            seller: &T::AccountId,
            quantity: u64,
            total: BalanceOf<T>,
        ) -> Result<EscrowId, DispatchError> {
            ensure!(quantity > 0, Error::<T>::ZeroQuantity);

            let escrow_id = EscrowCount::<T>::get();
            let next = escrow_id.checked_add(1).ok_or(Error::<T>::ArithmeticOverflow)?;

            Escrows::<T>::insert(
                escrow_id,
                EscrowRecord {
                    id: escrow_id,
                    buyer: buyer.clone(),
                    seller: seller.clone(),
                    quantity,
                    total,
                    released: Zero::zero(),
                    state: EscrowState::Created,
                    released_milestones: MilestoneSet::default(),
                },
            );
            EscrowCount::<T>::put(next);

            log::debug!(target: LOG_TARGET, "escrow {} created for {:?}", escrow_id, total);
            Self::deposit_event(Event::EscrowCreated {
                escrow_id,
                buyer: buyer.clone(),
                seller: seller.clone(),
                total,
            });
            Ok(escrow_id)
        }

        fn do_start(escrow_id: EscrowId) -> DispatchResult {
            Escrows::<T>::try_mutate(escrow_id, |maybe| -> DispatchResult {
                let escrow = maybe.as_mut().ok_or(Error::<T>::EscrowNotFound)?;
                ensure!(
                    escrow.state == EscrowState::Created,
                    Error::<T>::EscrowNotPending
                );

                let required = TotalLocked::<T>::get()
                    .checked_add(&escrow.total)
                    .ok_or(Error::<T>::ArithmeticOverflow)?;
                ensure!(
                    T::Currency::free_balance(&Self::account_id()) >= required,
                    Error::<T>::EscrowUnderfunded
                );

                escrow.state = EscrowState::Active;
                TotalLocked::<T>::put(required);
                Ok(())
            })?;

            log::debug!(target: LOG_TARGET, "escrow {} active", escrow_id);
            Self::deposit_event(Event::EscrowStarted { escrow_id });
            Ok(())
        }

        fn do_release(
            escrow_id: EscrowId,
            milestone: Milestone,
        ) -> Result<BalanceOf<T>, DispatchError> {
            with_storage_layer(|| {
                let (buyer, seller, amount, remainder) =
                    Escrows::<T>::try_mutate(escrow_id, |maybe| {
                        let escrow = maybe.as_mut().ok_or(Error::<T>::EscrowNotFound)?;
                        ensure!(escrow.is_active(), Error::<T>::EscrowNotActive);
                        ensure!(
                            !escrow.released_milestones.contains(milestone),
                            Error::<T>::MilestoneAlreadyReleased
                        );
                        if let Some(previous) = milestone.previous() {
                            ensure!(
                                escrow.released_milestones.contains(previous),
                                Error::<T>::MilestoneOutOfOrder
                            );
                        }

                        let amount = Self::tranche(escrow.total);
                        let released = escrow
                            .released
                            .checked_add(&amount)
                            .ok_or(Error::<T>::ArithmeticOverflow)?;
                        ensure!(released <= escrow.total, Error::<T>::ReleaseExceedsTotal);

                        escrow.released_milestones.insert(milestone);
                        escrow.released = released;

                        let mut remainder = Zero::zero();
                        if milestone == Milestone::Full {
                            remainder = escrow.total - released;
                            escrow.state = EscrowState::Released;
                        }

                        Ok::<_, DispatchError>((
                            escrow.buyer.clone(),
                            escrow.seller.clone(),
                            amount,
                            remainder,
                        ))
                    })?;

                TotalLocked::<T>::mutate(|locked| {
                    *locked = locked.saturating_sub(amount).saturating_sub(remainder)
                });

                // totals under four leave every tranche empty; the remainder goes back at Full
                let holder = Self::account_id();
                if !amount.is_zero() {
                    T::Currency::transfer(&holder, &seller, amount, ExistenceRequirement::AllowDeath)
                        .map_err(|_| Error::<T>::PayoutFailed)?;
                }

                log::info!(
                    target: LOG_TARGET,
                    "escrow {} released {}% tranche of {:?}",
                    escrow_id,
                    milestone.percent(),
                    amount
                );
                Self::deposit_event(Event::PaymentReleased {
                    escrow_id,
                    milestone,
                    amount,
                });

                if milestone == Milestone::Full {
                    if !remainder.is_zero() {
                        T::Currency::transfer(
                            &holder,
                            &buyer,
                            remainder,
                            ExistenceRequirement::AllowDeath,
                        )
                        .map_err(|_| Error::<T>::RefundFailed)?;
                    }
                    Self::deposit_event(Event::EscrowClosed {
                        escrow_id,
                        remainder,
                    });
                }

                Ok(amount)
            })
        }

        fn do_refund(escrow_id: EscrowId) -> Result<BalanceOf<T>, DispatchError> {
            with_storage_layer(|| {
                let (buyer, remaining) = Escrows::<T>::try_mutate(escrow_id, |maybe| {
                    let escrow = maybe.as_mut().ok_or(Error::<T>::EscrowNotFound)?;
                    ensure!(escrow.is_active(), Error::<T>::EscrowNotActive);

                    let remaining = escrow
                        .total
                        .checked_sub(&escrow.released)
                        .ok_or(Error::<T>::ArithmeticOverflow)?;
                    escrow.state = EscrowState::Refunded;

                    Ok::<_, DispatchError>((escrow.buyer.clone(), remaining))
                })?;

                TotalLocked::<T>::mutate(|locked| *locked = locked.saturating_sub(remaining));

                if !remaining.is_zero() {
                    T::Currency::transfer(
                        &Self::account_id(),
                        &buyer,
                        remaining,
                        ExistenceRequirement::AllowDeath,
                    )
                    .map_err(|_| Error::<T>::RefundFailed)?;
                }

                log::info!(target: LOG_TARGET, "escrow {} refunded {:?}", escrow_id, remaining);
                Self::deposit_event(Event::EscrowRefunded {
                    escrow_id,
                    amount: remaining,
                });
                Ok(remaining)
            })
        }

        fn do_discard(escrow_id: EscrowId) -> DispatchResult {
            Escrows::<T>::try_mutate(escrow_id, |maybe| -> DispatchResult {
                let escrow = maybe.as_mut().ok_or(Error::<T>::EscrowNotFound)?;
                ensure!(
                    escrow.state == EscrowState::Created,
                    Error::<T>::EscrowNotPending
                );
                escrow.state = EscrowState::Discarded;
                Ok(())
            })?;

            Self::deposit_event(Event::EscrowDiscarded { escrow_id });
            Ok(())
        }
    }

    impl<T: Config> EscrowLedger<T::AccountId, BalanceOf<T>> for Pallet<T> {
        fn holder() -> T::AccountId {
            Self::account_id()
        }

        fn create(
            buyer: &T::AccountId,
            seller: &T::AccountId,
            quantity: u64,
            total: BalanceOf<T>,
        ) -> Result<EscrowId, DispatchError> {
            Self::do_create(buyer, seller, quantity, total)
        }

        fn start(escrow_id: EscrowId) -> DispatchResult {
            Self::do_start(escrow_id)
        }

        fn release_payment(
            escrow_id: EscrowId,
            milestone: Milestone,
        ) -> Result<BalanceOf<T>, DispatchError> {
            Self::do_release(escrow_id, milestone)
        }

        fn process_refund(escrow_id: EscrowId) -> Result<BalanceOf<T>, DispatchError> {
            Self::do_refund(escrow_id)
        }

        fn discard(escrow_id: EscrowId) -> DispatchResult {
            Self::do_discard(escrow_id)
        }

        fn details(escrow_id: EscrowId) -> Option<EscrowOf<T>> {
            Escrows::<T>::get(escrow_id)
        }

        fn is_milestone_released(escrow_id: EscrowId, milestone: Milestone) -> bool {
            Escrows::<T>::get(escrow_id)
                .map(|e| e.released_milestones.contains(milestone))
                .unwrap_or(false)
        }
    }
}
