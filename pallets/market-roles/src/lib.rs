//! # Market Roles Pallet
//!
//! Role membership for the energy marketplace.
//!
//! ## Overview
//!
//! Every marketplace call is gated on one of three roles:
//!
//! - **User**: a registered producer or consumer; may create offers and negotiate.
//! - **Moderator**: may cancel abusive offers, attest energy delivery and arbitrate disputes.
//! - **Admin**: everything a moderator may do, plus granting and revoking roles.
//!
//! Other pallets never read this pallet's storage directly; they go through the
//! [`RoleGate`] trait so the gate can be swapped for any other membership source.
//!
//! ## Dispatchable Functions
//!
//! - `grant_role` - Admin origin or an `Admin` member grants a role
//! - `revoke_role` - Admin origin or an `Admin` member revokes a role
//! - `register_participant` - Self-service `User` registration (if enabled)

#![cfg_attr(not(feature = "std"), no_std)]
#![allow(deprecated, clippy::let_unit_value)]

extern crate alloc;

pub use pallet::*;


use alloc::vec::Vec;
use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use sp_runtime::RuntimeDebug;

const LOG_TARGET: &str = "runtime::market-roles";

/// A capability held by an account.
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
pub enum Role {
    /// Registered producer or consumer.
    User,
    /// Delivery attestation and offer moderation.
    Moderator,
    /// Full administrative rights.
    Admin,
}

/// Cross-pallet authorization capability.
///
/// Answers are fail-closed: an account that was never granted anything has no role.
pub trait RoleGate<AccountId> {
    fn has_role(who: &AccountId, role: Role) -> bool;

    /// Moderators and admins may both intervene in trades.
    fn is_staff(who: &AccountId) -> bool {
        Self::has_role(who, Role::Moderator) || Self::has_role(who, Role::Admin)
    }

    /// Grant `role` without an origin check. Benchmark setup only.
    #[cfg(feature = "runtime-benchmarks")]
    fn set_role(who: &AccountId, role: Role);
}

#[frame_support::pallet]
pub mod pallet {
    use super::*;
    use frame_support::pallet_prelude::*;
    use frame_system::pallet_prelude::*;

    #[pallet::config]
    pub trait Config: frame_system::Config {
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        type WeightInfo: WeightInfo;

        /// Origin allowed to manage roles without holding `Admin` (root / governance).
        type AdminOrigin: EnsureOrigin<Self::RuntimeOrigin>;

        /// Whether any signed account may register itself as a `User`.
        #[pallet::constant]
        type OpenRegistration: Get<bool>;
    }

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    // =========================================================
    // Storage
    // =========================================================

    #[pallet::storage]
    pub type RoleMembers<T: Config> = StorageDoubleMap<
        _,
        Twox64Concat,
        Role,
        Blake2_128Concat,
        T::AccountId,
        (),
        OptionQuery,
    >;

    #[pallet::storage]
    pub type MemberCount<T: Config> = StorageMap<_, Twox64Concat, Role, u32, ValueQuery>;

    // =========================================================
    // Genesis
    // =========================================================

    #[pallet::genesis_config]
    #[derive(frame_support::DefaultNoBound)]
    pub struct GenesisConfig<T: Config> {
        pub admins: Vec<T::AccountId>,
        pub moderators: Vec<T::AccountId>,
        pub users: Vec<T::AccountId>,
    }

    #[pallet::genesis_build]
    impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
        fn build(&self) {
            for who in &self.admins {
                Pallet::<T>::insert_member(who, Role::Admin);
            }
            for who in &self.moderators {
                Pallet::<T>::insert_member(who, Role::Moderator);
            }
            for who in &self.users {
                Pallet::<T>::insert_member(who, Role::User);
            }
        }
    }

    // =========================================================
    // Events
    // =========================================================

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        RoleGranted { who: T::AccountId, role: Role },
        RoleRevoked { who: T::AccountId, role: Role },
    }

    // =========================================================
    // Errors
    // =========================================================

    #[pallet::error]
    pub enum Error<T> {
        /// Caller is neither the admin origin nor an `Admin` member.
        NotAdmin,
        AlreadyHasRole,
        RoleNotHeld,
        /// Self-registration is disabled in this runtime.
        RegistrationClosed,
    }

    pub trait WeightInfo {
        fn grant_role() -> Weight;
        fn revoke_role() -> Weight;
        fn register_participant() -> Weight;
    }

    impl WeightInfo for () {
        fn grant_role() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn revoke_role() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn register_participant() -> Weight {
            Weight::from_parts(10_000, 0)
        }
    }

    // =========================================================
    // Extrinsics
    // =========================================================

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        #[pallet::call_index(0)]
        #[pallet::weight(T::WeightInfo::grant_role())]
        pub fn grant_role(origin: OriginFor<T>, who: T::AccountId, role: Role) -> DispatchResult {
            Self::ensure_admin(origin)?;
            ensure!(!Self::holds(&who, role), Error::<T>::AlreadyHasRole);

            Self::insert_member(&who, role);
            log::info!(target: LOG_TARGET, "granted {:?} to {:?}", role, who);

            Self::deposit_event(Event::RoleGranted { who, role });
            Ok(())
        }

        #[pallet::call_index(1)]
        #[pallet::weight(T::WeightInfo::revoke_role())]
        pub fn revoke_role(origin: OriginFor<T>, who: T::AccountId, role: Role) -> DispatchResult {
            Self::ensure_admin(origin)?;
            ensure!(Self::holds(&who, role), Error::<T>::RoleNotHeld);

            RoleMembers::<T>::remove(role, &who);
            MemberCount::<T>::mutate(role, |n| *n = n.saturating_sub(1));
            log::info!(target: LOG_TARGET, "revoked {:?} from {:?}", role, who);

            Self::deposit_event(Event::RoleRevoked { who, role });
            Ok(())
        }

        /// Register the caller as a marketplace `User`.
        #[pallet::call_index(2)]
        #[pallet::weight(T::WeightInfo::register_participant())]
        pub fn register_participant(origin: OriginFor<T>) -> DispatchResult {
            let who = ensure_signed(origin)?;
            ensure!(T::OpenRegistration::get(), Error::<T>::RegistrationClosed);
            ensure!(!Self::holds(&who, Role::User), Error::<T>::AlreadyHasRole);

            Self::insert_member(&who, Role::User);

            Self::deposit_event(Event::RoleGranted {
                who,
                role: Role::User,
            });
            Ok(())
        }
    }

    // =========================================================
    // Internal helpers
    // =========================================================

    impl<T: Config> Pallet<T> {
        fn ensure_admin(origin: OriginFor<T>) -> DispatchResult {
            if T::AdminOrigin::ensure_origin(origin.clone()).is_ok() {
                return Ok(());
            }
            let who = ensure_signed(origin)?;
            ensure!(Self::holds(&who, Role::Admin), Error::<T>::NotAdmin);
            Ok(())
        }

        fn holds(who: &T::AccountId, role: Role) -> bool {
            RoleMembers::<T>::contains_key(role, who)
        }

        fn insert_member(who: &T::AccountId, role: Role) {
            if !Self::holds(who, role) {
                RoleMembers::<T>::insert(role, who, ());
                MemberCount::<T>::mutate(role, |n| *n = n.saturating_add(1));
            }
        }
    }

    impl<T: Config> RoleGate<T::AccountId> for Pallet<T> {
        fn has_role(who: &T::AccountId, role: Role) -> bool {
            Self::holds(who, role)
        }

        #[cfg(feature = "runtime-benchmarks")]
        fn set_role(who: &T::AccountId, role: Role) {
            Self::insert_member(who, role);
        }
    }
}
