//! # Energy Offers Pallet
//!
//! Standing offers to buy or sell energy, and the negotiation threads attached to them.
//!
//! ## Overview
//!
//! An offer moves through:
//!
//! ```text
//! Active -> Negotiating -> Agreed -> InProgress -> Completed
//! ```
//!
//! with `Cancelled` reachable by the creator (while open), by moderation, or by the
//! agreement orchestrator after a refund. `Active` is re-entered when a negotiation is
//! cancelled or an agreement misses its funding deadline.
//!
//! Open offers sit in an ordered active set for discovery. Removal from that set is a
//! swap-with-last-and-pop through the `ActiveOfferIndex` position map.
//!
//! Offer ids are unguessable: a blake2 hash over the caller, the wall clock, a
//! registry-owned nonce and the runtime's randomness source.
//!
//! ## Dispatchable Functions
//!
//! - `create_offer` - Registered user lists a new offer
//! - `update_offer` - Creator rewrites quantity, price and delivery window
//! - `add_negotiation_message` - Append a note and optional counter-proposal
//! - `accept_negotiation` - Creator locks in the latest counter-proposal
//! - `cancel_negotiation` - Creator drops the negotiation and relists
//! - `cancel_offer` - Creator withdraws an open offer
//! - `moderate_offer` - Moderator or admin force-cancels an open offer
//!
//! The agreement orchestrator drives the remaining transitions through [`OfferRegistry`].

#![cfg_attr(not(feature = "std"), no_std)]
#![allow(deprecated, clippy::let_unit_value)]

extern crate alloc;

pub use pallet::*;

pub mod weights;
pub use weights::WeightInfo;

#[cfg(test)]
mod mock;

#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;

use alloc::vec::Vec;
use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use sp_core::H256;
use sp_runtime::{DispatchError, DispatchResult, RuntimeDebug};

const LOG_TARGET: &str = "runtime::energy-offers";

/// Randomness subject for offer id derivation.
const OFFER_ID_SUBJECT: &[u8] = b"energy-offers/id";

pub type OfferId = H256;

/// Smallest deliverable unit of energy.
pub type EnergyQuantity = u64;

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
pub enum Direction {
    /// Creator wants to buy; the counterparty delivers.
    Buy,
    /// Creator delivers; the counterparty pays.
    Sell,
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
pub enum OfferStatus {
    Active,
    Negotiating,
    Agreed,
    InProgress,
    Completed,
    Cancelled,
}

impl OfferStatus {
    /// Terms may still change.
    pub fn is_open(self) -> bool {
        matches!(self, OfferStatus::Active | OfferStatus::Negotiating)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OfferStatus::Completed | OfferStatus::Cancelled)
    }
}

/// The parts of an offer the agreement orchestrator needs.
#[derive(Clone, Eq, PartialEq, RuntimeDebug)]
pub struct OfferTerms<AccountId, Balance> {
    pub creator: AccountId,
    pub direction: Direction,
    pub quantity: EnergyQuantity,
    pub price_per_unit: Balance,
    pub total: Balance,
    pub status: OfferStatus,
    pub counterparty: Option<AccountId>,
    pub listed: bool,
}

/// Offer transitions owned by the agreement orchestrator.
///
/// Each method checks its own source status and fails with a state error otherwise.
pub trait OfferRegistry<AccountId, Balance> {
    fn terms(offer_id: OfferId) -> Option<OfferTerms<AccountId, Balance>>;

    /// Take an `Agreed` offer off the active set once an agreement is formed from it.
    fn bind_to_agreement(offer_id: OfferId) -> DispatchResult;

    /// `Agreed -> InProgress`.
    fn mark_in_progress(offer_id: OfferId) -> DispatchResult;

    /// `InProgress -> Completed`.
    fn mark_completed(offer_id: OfferId) -> DispatchResult;

    /// `Agreed | InProgress -> Cancelled` for a bound offer.
    fn mark_cancelled(offer_id: OfferId) -> DispatchResult;

    /// Return a bound `Agreed` offer to `Active`, clear its counterparty and relist it.
    fn reinstate(offer_id: OfferId) -> DispatchResult;
}

#[frame_support::pallet]
pub mod pallet {
    use super::*;
    use frame_support::{
        pallet_prelude::*,
        traits::{Currency, Randomness, UnixTime},
        CloneNoBound, EqNoBound, PartialEqNoBound, RuntimeDebugNoBound,
    };
    use frame_system::pallet_prelude::*;
    use pallet_market_roles::{Role, RoleGate};
    use sp_io::hashing::blake2_256;
    use sp_runtime::traits::{CheckedMul, Zero};

    pub type BalanceOf<T> =
        <<T as Config>::Currency as Currency<<T as frame_system::Config>::AccountId>>::Balance;

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
    pub struct Offer<T: Config> {
        pub id: OfferId,
        pub creator: T::AccountId,
        pub direction: Direction,
        pub quantity: EnergyQuantity,
        pub price_per_unit: BalanceOf<T>,
        /// Always `quantity * price_per_unit`.
        pub total: BalanceOf<T>,
        /// Delivery window `[delivery_start, delivery_end)`, unix seconds.
        pub delivery_start: u64,
        pub delivery_end: u64,
        pub status: OfferStatus,
        pub counterparty: Option<T::AccountId>,
        pub created_at: u64,
    }

    impl<T: Config> codec::DecodeWithMemTracking for Offer<T> {}

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
    pub struct NegotiationMessage<T: Config> {
        pub sender: T::AccountId,
        pub timestamp: u64,
        pub note: BoundedVec<u8, T::MaxNoteLength>,
        /// Zero keeps the current price.
        pub proposed_price: BalanceOf<T>,
        /// Zero keeps the current quantity.
        pub proposed_quantity: EnergyQuantity,
    }

    impl<T: Config> codec::DecodeWithMemTracking for NegotiationMessage<T> {}

    // =========================================================
    // Config
    // =========================================================

    #[pallet::config]
    pub trait Config: frame_system::Config {
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        type WeightInfo: WeightInfo;

        /// Unit of account for prices and totals.
        type Currency: Currency<Self::AccountId>;

        type Roles: RoleGate<Self::AccountId>;

        type TimeProvider: UnixTime;

        /// Entropy mixed into offer ids.
        type Randomness: Randomness<Self::Hash, BlockNumberFor<Self>>;

        #[pallet::constant]
        type MaxActiveOffers: Get<u32>;

        /// Open or in-flight offers a single account may hold.
        #[pallet::constant]
        type MaxOffersPerUser: Get<u32>;

        #[pallet::constant]
        type MaxNegotiationMessages: Get<u32>;

        #[pallet::constant]
        type MaxNoteLength: Get<u32>;
    }

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    // =========================================================
    // Storage
    // =========================================================

    #[pallet::storage]
    pub type Offers<T: Config> = StorageMap<_, Blake2_128Concat, OfferId, Offer<T>, OptionQuery>;

    #[pallet::storage]
    pub type NegotiationLog<T: Config> = StorageMap<
        _,
        Blake2_128Concat,
        OfferId,
        BoundedVec<NegotiationMessage<T>, T::MaxNegotiationMessages>,
        ValueQuery,
    >;

    /// Discovery set of listed offers.
    #[pallet::storage]
    pub type ActiveOffers<T: Config> =
        StorageValue<_, BoundedVec<OfferId, T::MaxActiveOffers>, ValueQuery>;

    /// Position of each listed offer inside `ActiveOffers`.
    #[pallet::storage]
    pub type ActiveOfferIndex<T: Config> =
        StorageMap<_, Blake2_128Concat, OfferId, u32, OptionQuery>;

    /// Non-terminal offers per creator.
    #[pallet::storage]
    pub type OffersByUser<T: Config> = StorageMap<
        _,
        Blake2_128Concat,
        T::AccountId,
        BoundedVec<OfferId, T::MaxOffersPerUser>,
        ValueQuery,
    >;

    #[pallet::storage]
    pub type OfferNonce<T: Config> = StorageValue<_, u64, ValueQuery>;

    // =========================================================
    // Events
    // =========================================================

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        OfferCreated {
            offer_id: OfferId,
            creator: T::AccountId,
            direction: Direction,
            quantity: EnergyQuantity,
            price_per_unit: BalanceOf<T>,
            total: BalanceOf<T>,
        },
        OfferUpdated {
            offer_id: OfferId,
            status: OfferStatus,
        },
        NegotiationMessageAdded {
            offer_id: OfferId,
            index: u32,
            sender: T::AccountId,
        },
        OfferModerated {
            offer_id: OfferId,
            moderator: T::AccountId,
        },
    }

    // =========================================================
    // Errors
    // =========================================================

    #[pallet::error]
    pub enum Error<T> {
        // validation
        ZeroQuantity,
        ZeroPrice,
        /// Delivery end must come after delivery start.
        InvalidDeliveryWindow,
        /// Delivery must start in the future.
        DeliveryStartInPast,
        NoteTooLong,
        ArithmeticOverflow,
        // authorization
        /// Caller does not hold the `User` role.
        NotRegistered,
        NotCreator,
        NotModerator,
        // state
        OfferNotFound,
        InvalidOfferStatus,
        OfferNotListed,
        /// The offer is still listed, so no agreement owns it.
        OfferStillListed,
        /// Nobody but the creator has posted to the negotiation.
        NoCounterProposal,
        OfferIdCollision,
        // capacity
        TooManyActiveOffers,
        TooManyOffersPerUser,
        NegotiationLogFull,
    }

    // =========================================================
    // Extrinsics
    // =========================================================

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// (Index 0) List a new offer.
        #[pallet::call_index(0)]
        #[pallet::weight(T::WeightInfo::create_offer())]
        pub fn create_offer(
            origin: OriginFor<T>,
            direction: Direction,
            quantity: EnergyQuantity,
            price_per_unit: BalanceOf<T>,
            delivery_start: u64,
            delivery_end: u64,
        ) -> DispatchResult {
            let creator = ensure_signed(origin)?;
            ensure!(T::Roles::has_role(&creator, Role::User), Error::<T>::NotRegistered);

            let total = Self::validate_terms(quantity, price_per_unit, delivery_start, delivery_end)?;
            let offer_id = Self::generate_offer_id(&creator)?;

            OffersByUser::<T>::try_mutate(&creator, |ids| {
                ids.try_push(offer_id)
                    .map_err(|_| Error::<T>::TooManyOffersPerUser)
            })?;
            Self::list(offer_id)?;

            Offers::<T>::insert(
                offer_id,
                Offer {
                    id: offer_id,
                    creator: creator.clone(),
                    direction,
                    quantity,
                    price_per_unit,
                    total,
                    delivery_start,
                    delivery_end,
                    status: OfferStatus::Active,
                    counterparty: None,
                    created_at: Self::now(),
                },
            );

            log::debug!(target: LOG_TARGET, "offer {:?} listed by {:?}", offer_id, creator);
            Self::deposit_event(Event::OfferCreated {
                offer_id,
                creator,
                direction,
                quantity,
                price_per_unit,
                total,
            });
            Ok(())
        }

        /// (Index 1) Rewrite the terms of an open offer. Direction is fixed.
        #[pallet::call_index(1)]
        #[pallet::weight(T::WeightInfo::update_offer())]
        pub fn update_offer(
            origin: OriginFor<T>,
            offer_id: OfferId,
            quantity: EnergyQuantity,
            price_per_unit: BalanceOf<T>,
            delivery_start: u64,
            delivery_end: u64,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;

            let status = Offers::<T>::try_mutate(offer_id, |maybe| {
                let offer = maybe.as_mut().ok_or(Error::<T>::OfferNotFound)?;
                ensure!(offer.creator == who, Error::<T>::NotCreator);
                ensure!(offer.status.is_open(), Error::<T>::InvalidOfferStatus);

                offer.total =
                    Self::validate_terms(quantity, price_per_unit, delivery_start, delivery_end)?;
                offer.quantity = quantity;
                offer.price_per_unit = price_per_unit;
                offer.delivery_start = delivery_start;
                offer.delivery_end = delivery_end;

                Ok::<_, DispatchError>(offer.status)
            })?;

            Self::deposit_event(Event::OfferUpdated { offer_id, status });
            Ok(())
        }

        /// (Index 2) Append to the negotiation thread of an open offer.
        ///
        /// A zero `proposed_price` or `proposed_quantity` means "no change".
        #[pallet::call_index(2)]
        #[pallet::weight(T::WeightInfo::add_negotiation_message())]
        pub fn add_negotiation_message(
            origin: OriginFor<T>,
            offer_id: OfferId,
            note: Vec<u8>,
            proposed_price: BalanceOf<T>,
            proposed_quantity: EnergyQuantity,
        ) -> DispatchResult {
            let sender = ensure_signed(origin)?;
            ensure!(T::Roles::has_role(&sender, Role::User), Error::<T>::NotRegistered);

            let note: BoundedVec<u8, T::MaxNoteLength> =
                note.try_into().map_err(|_| Error::<T>::NoteTooLong)?;

            let mut offer = Offers::<T>::get(offer_id).ok_or(Error::<T>::OfferNotFound)?;
            ensure!(offer.status.is_open(), Error::<T>::InvalidOfferStatus);

            let index = NegotiationLog::<T>::try_mutate(offer_id, |log| {
                let index = log.len() as u32;
                log.try_push(NegotiationMessage {
                    sender: sender.clone(),
                    timestamp: Self::now(),
                    note,
                    proposed_price,
                    proposed_quantity,
                })
                .map_err(|_| Error::<T>::NegotiationLogFull)?;
                Ok::<_, DispatchError>(index)
            })?;

            Self::deposit_event(Event::NegotiationMessageAdded {
                offer_id,
                index,
                sender: sender.clone(),
            });

            if sender != offer.creator && offer.status == OfferStatus::Active {
                offer.status = OfferStatus::Negotiating;
                Offers::<T>::insert(offer_id, offer);
                Self::deposit_event(Event::OfferUpdated {
                    offer_id,
                    status: OfferStatus::Negotiating,
                });
            }
            Ok(())
        }

        /// (Index 3) Lock in the latest counter-proposal and record its sender as counterparty.
        #[pallet::call_index(3)]
        #[pallet::weight(T::WeightInfo::accept_negotiation())]
        pub fn accept_negotiation(origin: OriginFor<T>, offer_id: OfferId) -> DispatchResult {
            let who = ensure_signed(origin)?;
            let log = NegotiationLog::<T>::get(offer_id);

            let counterparty = Offers::<T>::try_mutate(offer_id, |maybe| {
                let offer = maybe.as_mut().ok_or(Error::<T>::OfferNotFound)?;
                ensure!(offer.creator == who, Error::<T>::NotCreator);
                ensure!(
                    offer.status == OfferStatus::Negotiating,
                    Error::<T>::InvalidOfferStatus
                );

                let proposal = log
                    .iter()
                    .rev()
                    .find(|m| m.sender != offer.creator)
                    .ok_or(Error::<T>::NoCounterProposal)?;

                if !proposal.proposed_price.is_zero() {
                    offer.price_per_unit = proposal.proposed_price;
                }
                if proposal.proposed_quantity > 0 {
                    offer.quantity = proposal.proposed_quantity;
                }
                offer.total = Self::total_of(offer.quantity, offer.price_per_unit)?;
                offer.counterparty = Some(proposal.sender.clone());
                offer.status = OfferStatus::Agreed;

                Ok::<_, DispatchError>(proposal.sender.clone())
            })?;

            log::debug!(target: LOG_TARGET, "offer {:?} agreed with {:?}", offer_id, counterparty);
            Self::deposit_event(Event::OfferUpdated {
                offer_id,
                status: OfferStatus::Agreed,
            });
            Ok(())
        }

        /// (Index 4) Drop the current negotiation and return the offer to `Active`.
        ///
        /// Also allowed on an `Agreed` offer nobody has formed an agreement from yet.
        #[pallet::call_index(4)]
        #[pallet::weight(T::WeightInfo::cancel_negotiation())]
        pub fn cancel_negotiation(origin: OriginFor<T>, offer_id: OfferId) -> DispatchResult {
            let who = ensure_signed(origin)?;
            let offer = Offers::<T>::get(offer_id).ok_or(Error::<T>::OfferNotFound)?;
            ensure!(offer.creator == who, Error::<T>::NotCreator);
            ensure!(Self::is_listed(&offer_id), Error::<T>::OfferNotListed);

            Self::transition(
                offer_id,
                &[OfferStatus::Negotiating, OfferStatus::Agreed],
                OfferStatus::Active,
            )?;
            Ok(())
        }

        /// (Index 5) Creator withdraws an open offer.
        #[pallet::call_index(5)]
        #[pallet::weight(T::WeightInfo::cancel_offer())]
        pub fn cancel_offer(origin: OriginFor<T>, offer_id: OfferId) -> DispatchResult {
            let who = ensure_signed(origin)?;
            let offer = Offers::<T>::get(offer_id).ok_or(Error::<T>::OfferNotFound)?;
            ensure!(offer.creator == who, Error::<T>::NotCreator);

            Self::close_open_offer(offer_id)
        }

        /// (Index 6) Staff force-cancel of an open offer, independent of the creator.
        #[pallet::call_index(6)]
        #[pallet::weight(T::WeightInfo::moderate_offer())]
        pub fn moderate_offer(origin: OriginFor<T>, offer_id: OfferId) -> DispatchResult {
            let moderator = ensure_signed(origin)?;
            ensure!(T::Roles::is_staff(&moderator), Error::<T>::NotModerator);
            ensure!(Offers::<T>::contains_key(offer_id), Error::<T>::OfferNotFound);

            Self::close_open_offer(offer_id)?;

            log::info!(target: LOG_TARGET, "offer {:?} moderated by {:?}", offer_id, moderator);
            Self::deposit_event(Event::OfferModerated {
                offer_id,
                moderator,
            });
            Ok(())
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

        pub fn offer(offer_id: OfferId) -> Option<Offer<T>> {
            Offers::<T>::get(offer_id)
        }

        pub fn active_offers() -> Vec<OfferId> {
            ActiveOffers::<T>::get().into_inner()
        }

        pub fn negotiation_log(offer_id: OfferId) -> Vec<NegotiationMessage<T>> {
            NegotiationLog::<T>::get(offer_id).into_inner()
        }

        pub fn offers_of(who: &T::AccountId) -> Vec<OfferId> {
            OffersByUser::<T>::get(who).into_inner()
        }

        pub fn is_listed(offer_id: &OfferId) -> bool {
            ActiveOfferIndex::<T>::contains_key(offer_id)
        }

        fn validate_terms(
            quantity: EnergyQuantity,
            price_per_unit: BalanceOf<T>,
            delivery_start: u64,
            delivery_end: u64,
        ) -> Result<BalanceOf<T>, DispatchError> {
            ensure!(quantity > 0, Error::<T>::ZeroQuantity);
            ensure!(!price_per_unit.is_zero(), Error::<T>::ZeroPrice);
            ensure!(delivery_end > delivery_start, Error::<T>::InvalidDeliveryWindow);
            ensure!(delivery_start > Self::now(), Error::<T>::DeliveryStartInPast);
            Self::total_of(quantity, price_per_unit)
        }

        fn total_of(
            quantity: EnergyQuantity,
            price_per_unit: BalanceOf<T>,
        ) -> Result<BalanceOf<T>, DispatchError> {
            let quantity =
                BalanceOf::<T>::try_from(quantity).map_err(|_| Error::<T>::ArithmeticOverflow)?;
            quantity
                .checked_mul(&price_per_unit)
                .ok_or_else(|| Error::<T>::ArithmeticOverflow.into())
        }

        /// Consume the next nonce and derive a fresh id. An id that already exists is
        /// rejected, never overwritten.
        fn generate_offer_id(creator: &T::AccountId) -> Result<OfferId, DispatchError> {
            let nonce = OfferNonce::<T>::get();
            OfferNonce::<T>::put(nonce.checked_add(1).ok_or(Error::<T>::ArithmeticOverflow)?);

            let offer_id = Self::derive_offer_id(creator, nonce);
            ensure!(!Offers::<T>::contains_key(offer_id), Error::<T>::OfferIdCollision);
            Ok(offer_id)
        }

        fn derive_offer_id(creator: &T::AccountId, nonce: u64) -> OfferId {
            let now_millis = T::TimeProvider::now().as_millis();
            let (entropy, _) = T::Randomness::random(&(OFFER_ID_SUBJECT, nonce).encode());
            H256::from(blake2_256(&(creator, now_millis, nonce, entropy).encode()))
        }

        fn list(offer_id: OfferId) -> DispatchResult {
            ActiveOffers::<T>::try_mutate(|active| {
                let position = active.len() as u32;
                active
                    .try_push(offer_id)
                    .map_err(|_| Error::<T>::TooManyActiveOffers)?;
                ActiveOfferIndex::<T>::insert(offer_id, position);
                Ok(())
            })
        }

        /// O(1) removal: the last listed offer takes the vacated slot.
        fn unlist(offer_id: OfferId) -> DispatchResult {
            let position =
                ActiveOfferIndex::<T>::take(offer_id).ok_or(Error::<T>::OfferNotListed)? as usize;
            ActiveOffers::<T>::mutate(|active| {
                if position < active.len() {
                    active.swap_remove(position);
                    if let Some(moved) = active.get(position) {
                        ActiveOfferIndex::<T>::insert(moved, position as u32);
                    }
                }
            });
            Ok(())
        }

        /// Creator or moderator cancellation of an `Active`/`Negotiating` offer.
        fn close_open_offer(offer_id: OfferId) -> DispatchResult {
            Self::transition(
                offer_id,
                &[OfferStatus::Active, OfferStatus::Negotiating],
                OfferStatus::Cancelled,
            )?;
            Self::unlist(offer_id)
        }

        /// Move an offer to `to` if its status is one of `from`, and emit `OfferUpdated`.
        fn transition(offer_id: OfferId, from: &[OfferStatus], to: OfferStatus) -> DispatchResult {
            let creator = Offers::<T>::try_mutate(offer_id, |maybe| {
                let offer = maybe.as_mut().ok_or(Error::<T>::OfferNotFound)?;
                ensure!(from.contains(&offer.status), Error::<T>::InvalidOfferStatus);

                offer.status = to;
                if to == OfferStatus::Active {
                    offer.counterparty = None;
                }
                Ok::<_, DispatchError>(offer.creator.clone())
            })?;

            if to.is_terminal() {
                OffersByUser::<T>::mutate(&creator, |ids| ids.retain(|id| *id != offer_id));
            }

            log::debug!(target: LOG_TARGET, "offer {:?} -> {:?}", offer_id, to);
            Self::deposit_event(Event::OfferUpdated {
                offer_id,
                status: to,
            });
            Ok(())
        }
    }

    impl<T: Config> OfferRegistry<T::AccountId, BalanceOf<T>> for Pallet<T> {
        fn terms(offer_id: OfferId) -> Option<OfferTerms<T::AccountId, BalanceOf<T>>> {
            Offers::<T>::get(offer_id).map(|offer| OfferTerms {
                listed: Self::is_listed(&offer_id),
                creator: offer.creator,
                direction: offer.direction,
                quantity: offer.quantity,
                price_per_unit: offer.price_per_unit,
                total: offer.total,
                status: offer.status,
                counterparty: offer.counterparty,
            })
        }

        fn bind_to_agreement(offer_id: OfferId) -> DispatchResult {
            let offer = Offers::<T>::get(offer_id).ok_or(Error::<T>::OfferNotFound)?;
            ensure!(
                offer.status == OfferStatus::Agreed,
                Error::<T>::InvalidOfferStatus
            );
            Self::unlist(offer_id)
        }

        fn mark_in_progress(offer_id: OfferId) -> DispatchResult {
            Self::transition(offer_id, &[OfferStatus::Agreed], OfferStatus::InProgress)
        }

        fn mark_completed(offer_id: OfferId) -> DispatchResult {
            Self::transition(offer_id, &[OfferStatus::InProgress], OfferStatus::Completed)
        }

        fn mark_cancelled(offer_id: OfferId) -> DispatchResult {
            ensure!(!Self::is_listed(&offer_id), Error::<T>::OfferStillListed);
            Self::transition(
                offer_id,
                &[OfferStatus::Agreed, OfferStatus::InProgress],
                OfferStatus::Cancelled,
            )
        }

        fn reinstate(offer_id: OfferId) -> DispatchResult {
            ensure!(!Self::is_listed(&offer_id), Error::<T>::OfferStillListed);
            Self::transition(offer_id, &[OfferStatus::Agreed], OfferStatus::Active)?;
            Self::list(offer_id)
        }
    }
}
