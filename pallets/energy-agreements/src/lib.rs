//! # Energy Agreements Pallet
//!
//! Binds an agreed offer and its counterparty into a trade, and drives that trade
//! through funding, milestone-gated delivery, disputes and settlement.
//!
//! ## Overview
//!
//! ```text
//! create_agreement ──> fund_agreement ──> start_energy_transfer ──> report 25/50/75/100
//!        │                                                              │
//!        └─(deadline missed)─> cancel_unfunded_agreement                ├─> TradeCompleted
//!                                                                       └─> dispute / resolve
//! ```
//!
//! - The buyer has `FundingWindow` seconds after formation to lock the full total
//!   into escrow. Past that, any participant or staff member may cancel and the offer
//!   is relisted.
//! - Each delivery report releases one quarter of the escrow to the seller straight
//!   away and opens a `DisputePeriod`-second window in which the buyer may contest it.
//!   `finalize_milestone` closes an uncontested window; it never moves value.
//! - Staff settle disputes. A buyer win refunds everything still in escrow and cancels
//!   the offer; a seller win leaves the agreement running.
//!
//! ## Atomicity
//!
//! Every call validates, then mutates its own records, then moves value through the
//! escrow pallet or the currency. Calls are transactional, so a failing transfer
//! discards the whole call. A per-agreement guard rejects nested entry while a call
//! on the same agreement is in flight.
//!
//! ## Dispatchable Functions
//!
//! - `create_agreement` - Accepted counterparty forms the trade
//! - `fund_agreement` - Buyer locks the total in escrow
//! - `cancel_unfunded_agreement` - Drop a trade whose funding deadline passed
//! - `start_energy_transfer` - Buyer marks delivery as begun
//! - `report_energy_delivery` - Seller or staff attests a delivery milestone
//! - `dispute_milestone` - Buyer contests a reported milestone
//! - `finalize_milestone` - Anyone closes an uncontested dispute window
//! - `dispute_and_refund` - Staff refund of a funded trade
//! - `resolve_dispute` - Staff ruling on a contested milestone

#![cfg_attr(not(feature = "std"), no_std)]
#![allow(deprecated, clippy::let_unit_value)]

extern crate alloc;

pub use pallet::*;

pub mod policy;
pub mod weights;
pub use weights::WeightInfo;

#[cfg(test)]
mod mock;

use alloc::vec::Vec;
use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use sp_runtime::RuntimeDebug;

pub use pallet_energy_offers::{Direction, EnergyQuantity, OfferId};
pub use pallet_milestone_escrow::{EscrowId, Milestone};

const LOG_TARGET: &str = "runtime::energy-agreements";

pub type AgreementId = u64;

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
pub enum Outcome {
    /// All four milestones delivered.
    Completed,
    /// Remaining escrow returned to the buyer by staff.
    Refunded,
    /// Never funded; the offer went back on the market.
    Cancelled,
}

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
pub enum CancellationReason {
    FundingDeadlineMissed,
}

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
pub enum RefundReason {
    /// Staff refund through `dispute_and_refund`.
    AdminRefund,
    /// Staff ruled for the buyer on a contested milestone.
    DisputeUpheld { pct: u8 },
}

#[frame_support::pallet]
pub mod pallet {
    use super::*;
    use crate::policy::{self, Operation};
    use frame_support::{
        pallet_prelude::*,
        traits::{Currency, ExistenceRequirement, UnixTime},
        CloneNoBound, EqNoBound, PartialEqNoBound, RuntimeDebugNoBound,
    };
    use frame_system::pallet_prelude::*;
    use pallet_energy_offers::{OfferRegistry, OfferStatus};
    use pallet_market_roles::RoleGate;
    use pallet_milestone_escrow::EscrowLedger;

    pub type BalanceOf<T> =
        <<T as Config>::Currency as Currency<<T as frame_system::Config>::AccountId>>::Balance;

    pub type ReasonOf<T> = BoundedVec<u8, <T as Config>::MaxReasonLength>;

    // =========================================================
    // Structs
    // =========================================================

    #[derive(
        CloneNoBound,
        PartialEqNoBound,
        EqNoBound,
        Encode,
        Decode,
        RuntimeDebugNoBound,
        TypeInfo,
        MaxEncodedLen,
    )]
    #[scale_info(skip_type_params(T))]
    pub struct Agreement<T: Config> {
        pub id: AgreementId,
        pub offer_id: OfferId,
        pub buyer: T::AccountId,
        pub seller: T::AccountId,
        pub quantity: EnergyQuantity,
        /// Fixed at formation, never recomputed.
        pub total: BalanceOf<T>,
        pub created_at: u64,
        pub funding_deadline: u64,
        pub funded: bool,
        pub escrow_id: EscrowId,
        pub active: bool,
        pub transfer_started: bool,
        pub outcome: Option<Outcome>,
    }

    impl<T: Config> codec::DecodeWithMemTracking for Agreement<T> {}

    /// Bookkeeping for one reported milestone.
    #[derive(
        CloneNoBound,
        PartialEqNoBound,
        EqNoBound,
        Encode,
        Decode,
        RuntimeDebugNoBound,
        TypeInfo,
        MaxEncodedLen,
    )]
    #[scale_info(skip_type_params(T))]
    pub struct MilestoneCompletion<T: Config> {
        pub reported_at: u64,
        /// Window still open: neither finalized nor disputed.
        pub can_dispute: bool,
        pub disputed: bool,
        /// Staff have ruled on the dispute.
        pub resolved: bool,
        pub dispute_reason: ReasonOf<T>,
    }

    impl<T: Config> codec::DecodeWithMemTracking for MilestoneCompletion<T> {}

    // =========================================================
    // Config
    // =========================================================

    #[pallet::config]
    pub trait Config: frame_system::Config {
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        type WeightInfo: WeightInfo;

        /// Value ledger the buyer funds escrow from.
        type Currency: Currency<Self::AccountId>;

        type Offers: OfferRegistry<Self::AccountId, BalanceOf<Self>>;

        type Escrow: EscrowLedger<Self::AccountId, BalanceOf<Self>>;

        type Roles: RoleGate<Self::AccountId>;

        type TimeProvider: UnixTime;

        /// Seconds the buyer has to fund after formation.
        #[pallet::constant]
        type FundingWindow: Get<u64>;

        /// Seconds after a delivery report during which the buyer may dispute it.
        #[pallet::constant]
        type DisputePeriod: Get<u64>;

        #[pallet::constant]
        type MaxReasonLength: Get<u32>;

        /// Live agreements a single account may take part in.
        #[pallet::constant]
        type MaxAgreementsPerUser: Get<u32>;
    }

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    // =========================================================
    // Storage
    // =========================================================

    #[pallet::storage]
    pub type Agreements<T: Config> =
        StorageMap<_, Blake2_128Concat, AgreementId, Agreement<T>, OptionQuery>;

    #[pallet::storage]
    pub type AgreementCount<T: Config> = StorageValue<_, AgreementId, ValueQuery>;

    /// The agreement currently owning each bound offer.
    #[pallet::storage]
    pub type AgreementByOffer<T: Config> =
        StorageMap<_, Blake2_128Concat, OfferId, AgreementId, OptionQuery>;

    #[pallet::storage]
    pub type MilestoneCompletions<T: Config> = StorageDoubleMap<
        _,
        Blake2_128Concat,
        AgreementId,
        Twox64Concat,
        Milestone,
        MilestoneCompletion<T>,
        OptionQuery,
    >;

    /// Live agreements per participant.
    #[pallet::storage]
    pub type AgreementsByUser<T: Config> = StorageMap<
        _,
        Blake2_128Concat,
        T::AccountId,
        BoundedVec<AgreementId, T::MaxAgreementsPerUser>,
        ValueQuery,
    >;

    /// Agreements with a call in flight.
    #[pallet::storage]
    pub type AgreementLocks<T: Config> = StorageMap<_, Twox64Concat, AgreementId, (), OptionQuery>;

    // =========================================================
    // Events
    // =========================================================

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        AgreementCreated {
            agreement_id: AgreementId,
            offer_id: OfferId,
            buyer: T::AccountId,
            seller: T::AccountId,
            total: BalanceOf<T>,
            funding_deadline: u64,
        },
        AgreementFunded {
            agreement_id: AgreementId,
            amount: BalanceOf<T>,
        },
        AgreementCancelled {
            agreement_id: AgreementId,
            reason: CancellationReason,
        },
        EnergyTransferStarted {
            agreement_id: AgreementId,
        },
        EnergyDeliveryProgress {
            agreement_id: AgreementId,
            pct: u8,
            amount: BalanceOf<T>,
        },
        MilestoneDisputed {
            agreement_id: AgreementId,
            pct: u8,
            reason: ReasonOf<T>,
        },
        MilestoneFinalized {
            agreement_id: AgreementId,
            pct: u8,
        },
        TradeCompleted {
            agreement_id: AgreementId,
        },
        TradeRefunded {
            agreement_id: AgreementId,
            amount: BalanceOf<T>,
            reason: RefundReason,
            note: ReasonOf<T>,
        },
        DisputeResolved {
            agreement_id: AgreementId,
            pct: u8,
            buyer_wins: bool,
        },
    }

    // =========================================================
    // Errors
    // =========================================================

    #[pallet::error]
    pub enum Error<T> {
        // validation
        /// Only 25, 50, 75 and 100 are delivery milestones.
        InvalidMilestone,
        ReasonTooLong,
        ArithmeticOverflow,
        // authorization
        NotBuyer,
        /// Caller is neither the seller nor staff.
        NotAuthorizedReporter,
        NotParticipant,
        NotStaff,
        /// Only the counterparty recorded at acceptance may form the agreement.
        NotCounterparty,
        // state
        OfferNotFound,
        OfferNotAgreed,
        OfferAlreadyBound,
        AgreementNotFound,
        AgreementNotActive,
        /// Refunded or cancelled agreements take no further disputes.
        AgreementClosed,
        AlreadyFunded,
        NotFunded,
        TransferNotStarted,
        TransferAlreadyStarted,
        MilestoneAlreadyReported,
        MilestoneNotReported,
        /// The dispute window was already closed by finalization or a dispute.
        MilestoneNotDisputable,
        MilestoneUnderDispute,
        MilestoneAlreadyFinalized,
        MilestoneNotDisputed,
        DisputeAlreadyResolved,
        /// Another call on this agreement is still in flight.
        AgreementLocked,
        TooManyAgreements,
        // external dependency
        /// The buyer's transfer into escrow was refused by the currency.
        FundingTransferFailed,
        // temporal
        FundingDeadlinePassed,
        FundingDeadlineNotReached,
        DisputeWindowClosed,
        DisputeWindowOpen,
    }

    // =========================================================
    // Extrinsics
    // =========================================================

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// (Index 0) Form an agreement from an `Agreed` offer.
        ///
        /// BUY offers make the creator the buyer; SELL offers make the creator the seller.
        #[pallet::call_index(0)]
        #[pallet::weight(T::WeightInfo::create_agreement())]
        pub fn create_agreement(origin: OriginFor<T>, offer_id: OfferId) -> DispatchResult {
            let caller = ensure_signed(origin)?;

            let terms = T::Offers::terms(offer_id).ok_or(Error::<T>::OfferNotFound)?;
            ensure!(
                terms.status == OfferStatus::Agreed,
                Error::<T>::OfferNotAgreed
            );
            ensure!(
                !AgreementByOffer::<T>::contains_key(offer_id),
                Error::<T>::OfferAlreadyBound
            );
            ensure!(
                terms.counterparty.as_ref() == Some(&caller),
                Error::<T>::NotCounterparty
            );

            let (buyer, seller) = match terms.direction {
                Direction::Buy => (terms.creator, caller),
                Direction::Sell => (caller, terms.creator),
            };

            let agreement_id = AgreementCount::<T>::get();
            AgreementCount::<T>::put(
                agreement_id
                    .checked_add(1)
                    .ok_or(Error::<T>::ArithmeticOverflow)?,
            );

            let now = Self::now();
            let funding_deadline = now
                .checked_add(T::FundingWindow::get())
                .ok_or(Error::<T>::ArithmeticOverflow)?;

            let escrow_id = T::Escrow::create(&buyer, &seller, terms.quantity, terms.total)?;
            T::Offers::bind_to_agreement(offer_id)?;

            Self::index_participant(&buyer, agreement_id)?;
            Self::index_participant(&seller, agreement_id)?;
            AgreementByOffer::<T>::insert(offer_id, agreement_id);
            Agreements::<T>::insert(
                agreement_id,
                Agreement {
                    id: agreement_id,
                    offer_id,
                    buyer: buyer.clone(),
                    seller: seller.clone(),
                    quantity: terms.quantity,
                    total: terms.total,
                    created_at: now,
                    funding_deadline,
                    funded: false,
                    escrow_id,
                    active: true,
                    transfer_started: false,
                    outcome: None,
                },
            );

            log::debug!(
                target: LOG_TARGET,
                "agreement {} formed from offer {:?}, funding due by {}",
                agreement_id,
                offer_id,
                funding_deadline
            );
            Self::deposit_event(Event::AgreementCreated {
                agreement_id,
                offer_id,
                buyer,
                seller,
                total: terms.total,
                funding_deadline,
            });
            Ok(())
        }

        /// (Index 1) Buyer moves the full total into escrow.
        #[pallet::call_index(1)]
        #[pallet::weight(T::WeightInfo::fund_agreement())]
        pub fn fund_agreement(origin: OriginFor<T>, agreement_id: AgreementId) -> DispatchResult {
            let caller = ensure_signed(origin)?;

            Self::with_agreement_guard(agreement_id, || {
                let mut agreement = Self::agreement_of(agreement_id)?;
                policy::authorize::<T>(Operation::Fund, &caller, &agreement)?;
                ensure!(agreement.active, Error::<T>::AgreementNotActive);
                ensure!(!agreement.funded, Error::<T>::AlreadyFunded);
                ensure!(
                    Self::now() <= agreement.funding_deadline,
                    Error::<T>::FundingDeadlinePassed
                );

                agreement.funded = true;
                Agreements::<T>::insert(agreement_id, &agreement);

                T::Currency::transfer(
                    &agreement.buyer,
                    &T::Escrow::holder(),
                    agreement.total,
                    ExistenceRequirement::KeepAlive,
                )
                .map_err(|_| Error::<T>::FundingTransferFailed)?;
                T::Escrow::start(agreement.escrow_id)?;

                log::info!(
                    target: LOG_TARGET,
                    "agreement {} funded with {:?}",
                    agreement_id,
                    agreement.total
                );
                Self::deposit_event(Event::AgreementFunded {
                    agreement_id,
                    amount: agreement.total,
                });
                Ok(())
            })
        }

        /// (Index 2) Drop an agreement whose buyer missed the funding deadline and
        /// put the offer back on the market.
        #[pallet::call_index(2)]
        #[pallet::weight(T::WeightInfo::cancel_unfunded_agreement())]
        pub fn cancel_unfunded_agreement(
            origin: OriginFor<T>,
            agreement_id: AgreementId,
        ) -> DispatchResult {
            let caller = ensure_signed(origin)?;

            Self::with_agreement_guard(agreement_id, || {
                let mut agreement = Self::agreement_of(agreement_id)?;
                policy::authorize::<T>(Operation::CancelUnfunded, &caller, &agreement)?;
                ensure!(agreement.active, Error::<T>::AgreementNotActive);
                ensure!(!agreement.funded, Error::<T>::AlreadyFunded);
                ensure!(
                    Self::now() > agreement.funding_deadline,
                    Error::<T>::FundingDeadlineNotReached
                );

                Self::close(&mut agreement, Outcome::Cancelled);
                AgreementByOffer::<T>::remove(agreement.offer_id);

                T::Escrow::discard(agreement.escrow_id)?;
                T::Offers::reinstate(agreement.offer_id)?;

                log::debug!(target: LOG_TARGET, "agreement {} cancelled unfunded", agreement_id);
                Self::deposit_event(Event::AgreementCancelled {
                    agreement_id,
                    reason: CancellationReason::FundingDeadlineMissed,
                });
                Ok(())
            })
        }

        /// (Index 3) Buyer marks delivery as begun. Milestone reports are accepted from here on.
        #[pallet::call_index(3)]
        #[pallet::weight(T::WeightInfo::start_energy_transfer())]
        pub fn start_energy_transfer(
            origin: OriginFor<T>,
            agreement_id: AgreementId,
        ) -> DispatchResult {
            let caller = ensure_signed(origin)?;

            Self::with_agreement_guard(agreement_id, || {
                let mut agreement = Self::agreement_of(agreement_id)?;
                policy::authorize::<T>(Operation::StartTransfer, &caller, &agreement)?;
                ensure!(agreement.active, Error::<T>::AgreementNotActive);
                ensure!(agreement.funded, Error::<T>::NotFunded);
                ensure!(
                    !agreement.transfer_started,
                    Error::<T>::TransferAlreadyStarted
                );

                agreement.transfer_started = true;
                Agreements::<T>::insert(agreement_id, &agreement);
                T::Offers::mark_in_progress(agreement.offer_id)?;

                Self::deposit_event(Event::EnergyTransferStarted { agreement_id });
                Ok(())
            })
        }

        /// (Index 4) Attest delivery up to `pct` percent and release that tranche.
        ///
        /// A 100% report completes the trade.
        #[pallet::call_index(4)]
        #[pallet::weight(T::WeightInfo::report_energy_delivery())]
        pub fn report_energy_delivery(
            origin: OriginFor<T>,
            agreement_id: AgreementId,
            pct: u8,
        ) -> DispatchResult {
            let caller = ensure_signed(origin)?;
            let milestone = Milestone::from_percent(pct).ok_or(Error::<T>::InvalidMilestone)?;

            Self::with_agreement_guard(agreement_id, || {
                let mut agreement = Self::agreement_of(agreement_id)?;
                policy::authorize::<T>(Operation::ReportDelivery, &caller, &agreement)?;
                ensure!(agreement.active, Error::<T>::AgreementNotActive);
                ensure!(agreement.funded, Error::<T>::NotFunded);
                ensure!(agreement.transfer_started, Error::<T>::TransferNotStarted);
                ensure!(
                    !MilestoneCompletions::<T>::contains_key(agreement_id, milestone),
                    Error::<T>::MilestoneAlreadyReported
                );

                MilestoneCompletions::<T>::insert(
                    agreement_id,
                    milestone,
                    MilestoneCompletion {
                        reported_at: Self::now(),
                        can_dispute: true,
                        disputed: false,
                        resolved: false,
                        dispute_reason: Default::default(),
                    },
                );
                let completes = milestone == Milestone::Full;
                if completes {
                    Self::close(&mut agreement, Outcome::Completed);
                }

                let amount = T::Escrow::release_payment(agreement.escrow_id, milestone)?;
                Self::deposit_event(Event::EnergyDeliveryProgress {
                    agreement_id,
                    pct,
                    amount,
                });

                if completes {
                    T::Offers::mark_completed(agreement.offer_id)?;
                    log::info!(target: LOG_TARGET, "agreement {} completed", agreement_id);
                    Self::deposit_event(Event::TradeCompleted { agreement_id });
                }
                Ok(())
            })
        }

        /// (Index 5) Buyer contests a reported milestone while its window is open.
        #[pallet::call_index(5)]
        #[pallet::weight(T::WeightInfo::dispute_milestone())]
        pub fn dispute_milestone(
            origin: OriginFor<T>,
            agreement_id: AgreementId,
            pct: u8,
            reason: Vec<u8>,
        ) -> DispatchResult {
            let caller = ensure_signed(origin)?;
            let milestone = Milestone::from_percent(pct).ok_or(Error::<T>::InvalidMilestone)?;
            let reason: ReasonOf<T> = reason.try_into().map_err(|_| Error::<T>::ReasonTooLong)?;

            Self::with_agreement_guard(agreement_id, || {
                let agreement = Self::agreement_of(agreement_id)?;
                policy::authorize::<T>(Operation::DisputeMilestone, &caller, &agreement)?;
                ensure!(
                    matches!(agreement.outcome, None | Some(Outcome::Completed)),
                    Error::<T>::AgreementClosed
                );

                let now = Self::now();
                MilestoneCompletions::<T>::try_mutate(agreement_id, milestone, |maybe| {
                    let completion = maybe.as_mut().ok_or(Error::<T>::MilestoneNotReported)?;
                    ensure!(completion.can_dispute, Error::<T>::MilestoneNotDisputable);
                    ensure!(
                        now <= Self::window_end(completion.reported_at)?,
                        Error::<T>::DisputeWindowClosed
                    );

                    completion.disputed = true;
                    completion.can_dispute = false;
                    completion.dispute_reason = reason.clone();
                    Ok::<_, DispatchError>(())
                })?;

                log::info!(target: LOG_TARGET, "agreement {} milestone {}% disputed", agreement_id, pct);
                Self::deposit_event(Event::MilestoneDisputed {
                    agreement_id,
                    pct,
                    reason,
                });
                Ok(())
            })
        }

        /// (Index 6) Close the dispute window of an uncontested milestone once it has elapsed.
        ///
        /// Value already moved at report time; this only records that nobody objected.
        #[pallet::call_index(6)]
        #[pallet::weight(T::WeightInfo::finalize_milestone())]
        pub fn finalize_milestone(
            origin: OriginFor<T>,
            agreement_id: AgreementId,
            pct: u8,
        ) -> DispatchResult {
            let caller = ensure_signed(origin)?;
            let milestone = Milestone::from_percent(pct).ok_or(Error::<T>::InvalidMilestone)?;

            Self::with_agreement_guard(agreement_id, || {
                let agreement = Self::agreement_of(agreement_id)?;
                policy::authorize::<T>(Operation::FinalizeMilestone, &caller, &agreement)?;

                let now = Self::now();
                MilestoneCompletions::<T>::try_mutate(agreement_id, milestone, |maybe| {
                    let completion = maybe.as_mut().ok_or(Error::<T>::MilestoneNotReported)?;
                    ensure!(!completion.resolved, Error::<T>::DisputeAlreadyResolved);
                    ensure!(!completion.disputed, Error::<T>::MilestoneUnderDispute);
                    ensure!(completion.can_dispute, Error::<T>::MilestoneAlreadyFinalized);
                    ensure!(
                        now > Self::window_end(completion.reported_at)?,
                        Error::<T>::DisputeWindowOpen
                    );

                    completion.can_dispute = false;
                    Ok::<_, DispatchError>(())
                })?;

                Self::deposit_event(Event::MilestoneFinalized { agreement_id, pct });
                Ok(())
            })
        }

        /// (Index 7) Staff refund of everything still in escrow. Cancels the offer.
        #[pallet::call_index(7)]
        #[pallet::weight(T::WeightInfo::dispute_and_refund())]
        pub fn dispute_and_refund(
            origin: OriginFor<T>,
            agreement_id: AgreementId,
            reason: Vec<u8>,
        ) -> DispatchResult {
            let caller = ensure_signed(origin)?;
            let note: ReasonOf<T> = reason.try_into().map_err(|_| Error::<T>::ReasonTooLong)?;

            Self::with_agreement_guard(agreement_id, || {
                let mut agreement = Self::agreement_of(agreement_id)?;
                policy::authorize::<T>(Operation::AdminRefund, &caller, &agreement)?;
                ensure!(agreement.active, Error::<T>::AgreementNotActive);
                ensure!(agreement.funded, Error::<T>::NotFunded);

                log::info!(target: LOG_TARGET, "agreement {} refunded by {:?}", agreement_id, caller);
                Self::refund(&mut agreement, RefundReason::AdminRefund, note)
            })
        }

        /// (Index 8) Staff ruling on a disputed milestone.
        ///
        /// A buyer win on a live agreement refunds the remaining escrow and cancels the
        /// offer; on a completed trade it is only recorded. A seller win keeps the tranche
        /// already paid at report time and leaves the agreement running.
        #[pallet::call_index(8)]
        #[pallet::weight(T::WeightInfo::resolve_dispute())]
        pub fn resolve_dispute(
            origin: OriginFor<T>,
            agreement_id: AgreementId,
            pct: u8,
            buyer_wins: bool,
        ) -> DispatchResult {
            let caller = ensure_signed(origin)?;
            let milestone = Milestone::from_percent(pct).ok_or(Error::<T>::InvalidMilestone)?;

            Self::with_agreement_guard(agreement_id, || {
                let mut agreement = Self::agreement_of(agreement_id)?;
                policy::authorize::<T>(Operation::ResolveDispute, &caller, &agreement)?;

                let dispute_reason =
                    MilestoneCompletions::<T>::try_mutate(agreement_id, milestone, |maybe| {
                        let completion =
                            maybe.as_mut().ok_or(Error::<T>::MilestoneNotReported)?;
                        ensure!(completion.disputed, Error::<T>::MilestoneNotDisputed);
                        ensure!(!completion.resolved, Error::<T>::DisputeAlreadyResolved);

                        completion.resolved = true;
                        Ok::<_, DispatchError>(completion.dispute_reason.clone())
                    })?;

                // the seller was paid when the milestone was reported
                if buyer_wins && agreement.active {
                    Self::refund(
                        &mut agreement,
                        RefundReason::DisputeUpheld { pct },
                        dispute_reason,
                    )?;
                }

                log::info!(
                    target: LOG_TARGET,
                    "agreement {} dispute on {}% resolved, buyer_wins={}",
                    agreement_id,
                    pct,
                    buyer_wins
                );
                Self::deposit_event(Event::DisputeResolved {
                    agreement_id,
                    pct,
                    buyer_wins,
                });
                Ok(())
            })
        }
    }

    // =========================================================
    // Internal helpers
    // =========================================================

    impl<T: Config> Pallet<T> {
        /// Current wall clock, unix seconds.
        pub fn now() -> u64 {
            T::TimeProvider::now().as_secs()
        }

        pub fn agreement(agreement_id: AgreementId) -> Option<Agreement<T>> {
            Agreements::<T>::get(agreement_id)
        }

        pub fn agreements_of(who: &T::AccountId) -> Vec<AgreementId> {
            AgreementsByUser::<T>::get(who).into_inner()
        }

        pub fn milestone_completion(
            agreement_id: AgreementId,
            milestone: Milestone,
        ) -> Option<MilestoneCompletion<T>> {
            MilestoneCompletions::<T>::get(agreement_id, milestone)
        }

        fn agreement_of(agreement_id: AgreementId) -> Result<Agreement<T>, DispatchError> {
            Agreements::<T>::get(agreement_id).ok_or_else(|| Error::<T>::AgreementNotFound.into())
        }

        fn window_end(reported_at: u64) -> Result<u64, DispatchError> {
            reported_at
                .checked_add(T::DisputePeriod::get())
                .ok_or_else(|| Error::<T>::ArithmeticOverflow.into())
        }

        /// Run `f` holding the agreement's lock. Nested entry on the same agreement is
        /// rejected with `AgreementLocked`; the lock is dropped on every exit path.
        pub(crate) fn with_agreement_guard<R>(
            agreement_id: AgreementId,
            f: impl FnOnce() -> Result<R, DispatchError>,
        ) -> Result<R, DispatchError> {
            ensure!(
                !AgreementLocks::<T>::contains_key(agreement_id),
                Error::<T>::AgreementLocked
            );
            AgreementLocks::<T>::insert(agreement_id, ());
            let result = f();
            AgreementLocks::<T>::remove(agreement_id);
            result
        }

        fn index_participant(who: &T::AccountId, agreement_id: AgreementId) -> DispatchResult {
            AgreementsByUser::<T>::try_mutate(who, |ids| {
                ids.try_push(agreement_id)
                    .map_err(|_| Error::<T>::TooManyAgreements.into())
            })
        }

        /// Deactivate with `outcome`, persist, and drop it from both participants' indexes.
        fn close(agreement: &mut Agreement<T>, outcome: Outcome) {
            agreement.active = false;
            agreement.outcome = Some(outcome);
            Agreements::<T>::insert(agreement.id, &*agreement);

            for who in [&agreement.buyer, &agreement.seller] {
                AgreementsByUser::<T>::mutate(who, |ids| ids.retain(|id| *id != agreement.id));
            }
        }

        fn refund(
            agreement: &mut Agreement<T>,
            reason: RefundReason,
            note: ReasonOf<T>,
        ) -> DispatchResult {
            Self::close(agreement, Outcome::Refunded);

            let amount = T::Escrow::process_refund(agreement.escrow_id)?;
            T::Offers::mark_cancelled(agreement.offer_id)?;

            Self::deposit_event(Event::TradeRefunded {
                agreement_id: agreement.id,
                amount,
                reason,
                note,
            });
            Ok(())
        }
    }
}
