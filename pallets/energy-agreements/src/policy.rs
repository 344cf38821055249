//! Who may drive each agreement transition.
//!
//! Every entry point consults [`authorize`] before touching state. Answers fail
//! closed: an operation not listed for the caller's relation to the agreement is denied.

use crate::pallet::{Agreement, Config, Error};
use frame_support::ensure;
use pallet_market_roles::RoleGate;
use sp_runtime::{DispatchResult, RuntimeDebug};

#[derive(Clone, Copy, Eq, PartialEq, RuntimeDebug)]
pub enum Operation {
    Fund,
    StartTransfer,
    ReportDelivery,
    DisputeMilestone,
    FinalizeMilestone,
    CancelUnfunded,
    AdminRefund,
    ResolveDispute,
}

pub fn authorize<T: Config>(
    operation: Operation,
    caller: &T::AccountId,
    agreement: &Agreement<T>,
) -> DispatchResult {
    let is_buyer = *caller == agreement.buyer;
    let is_seller = *caller == agreement.seller;

    let (allowed, denial) = match operation {
        Operation::Fund | Operation::StartTransfer | Operation::DisputeMilestone => {
            (is_buyer, Error::<T>::NotBuyer)
        }
        // the deliverer attests, or staff on their behalf
        Operation::ReportDelivery => (
            is_seller || T::Roles::is_staff(caller),
            Error::<T>::NotAuthorizedReporter,
        ),
        Operation::CancelUnfunded => (
            is_buyer || is_seller || T::Roles::is_staff(caller),
            Error::<T>::NotParticipant,
        ),
        Operation::FinalizeMilestone => (true, Error::<T>::NotParticipant),
        Operation::AdminRefund | Operation::ResolveDispute => {
            (T::Roles::is_staff(caller), Error::<T>::NotStaff)
        }
    };

    ensure!(allowed, denial);
    Ok(())
}
