//! Mock runtime for energy offers tests.

#![cfg(test)]

use crate as pallet_energy_offers;
use frame_support::{
    derive_impl, parameter_types,
    traits::{ConstU32, ConstU64, Randomness},
};
use pallet_balances::AccountData;
use sp_core::H256;
use sp_runtime::BuildStorage;

type Block = frame_system::mocking::MockBlock<Test>;

// =========================================================
// Mock Randomness
// =========================================================

/// Deterministic entropy: a hash of the subject and the current block.
pub struct TestRandomness;

impl Randomness<H256, u64> for TestRandomness {
    fn random(subject: &[u8]) -> (H256, u64) {
        let block = System::block_number();
        let seed = sp_io::hashing::blake2_256(&[subject, &block.to_le_bytes()].concat());
        (H256::from(seed), block)
    }
}

// =========================================================
// Mock Runtime
// =========================================================

frame_support::construct_runtime!(
    pub enum Test {
        System: frame_system,
        Balances: pallet_balances,
        Timestamp: pallet_timestamp,
        Roles: pallet_market_roles,
        EnergyOffers: pallet_energy_offers,
    }
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Test {
    type Block = Block;
    type AccountData = AccountData<u64>;
}

impl pallet_balances::Config for Test {
    type MaxLocks = ConstU32<50>;
    type MaxReserves = ConstU32<50>;
    type ReserveIdentifier = [u8; 8];
    type Balance = u64;
    type RuntimeEvent = RuntimeEvent;
    type DustRemoval = ();
    type ExistentialDeposit = ConstU64<1>;
    type AccountStore = System;
    type WeightInfo = ();
    type FreezeIdentifier = ();
    type MaxFreezes = ConstU32<0>;
    type RuntimeHoldReason = ();
    type RuntimeFreezeReason = ();
    type DoneSlashHandler = ();
}

impl pallet_timestamp::Config for Test {
    type Moment = u64;
    type OnTimestampSet = ();
    type MinimumPeriod = ConstU64<1>;
    type WeightInfo = ();
}

impl pallet_market_roles::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type WeightInfo = ();
    type AdminOrigin = frame_system::EnsureRoot<u64>;
    type OpenRegistration = OpenRegistration;
}

parameter_types! {
    pub const OpenRegistration: bool = true;
    pub const MaxActiveOffers: u32 = 4;
    pub const MaxOffersPerUser: u32 = 3;
    pub const MaxNegotiationMessages: u32 = 4;
    pub const MaxNoteLength: u32 = 32;
}

impl pallet_energy_offers::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type WeightInfo = ();
    type Currency = Balances;
    type Roles = Roles;
    type TimeProvider = Timestamp;
    type Randomness = TestRandomness;
    type MaxActiveOffers = MaxActiveOffers;
    type MaxOffersPerUser = MaxOffersPerUser;
    type MaxNegotiationMessages = MaxNegotiationMessages;
    type MaxNoteLength = MaxNoteLength;
}

pub const ADMIN: u64 = 1;
pub const MODERATOR: u64 = 2;
pub const ALICE: u64 = 3;
pub const BOB: u64 = 4;
pub const CHARLIE: u64 = 5;
/// Holds no role at all.
pub const STRANGER: u64 = 9;

/// Genesis clock, unix seconds.
pub const START_SECS: u64 = 1_700_000_000;

/// Move the clock to `secs` (unix seconds).
pub fn set_time(secs: u64) {
    Timestamp::set_timestamp(secs * 1_000);
}

pub fn new_test_ext() -> sp_io::TestExternalities {
    let mut storage = frame_system::GenesisConfig::<Test>::default()
        .build_storage()
        .unwrap();

    pallet_market_roles::GenesisConfig::<Test> {
        admins: vec![ADMIN],
        moderators: vec![MODERATOR],
        users: vec![ALICE, BOB, CHARLIE],
    }
    .assimilate_storage(&mut storage)
    .unwrap();

    let mut ext = sp_io::TestExternalities::new(storage);
    ext.execute_with(|| {
        System::set_block_number(1);
        set_time(START_SECS);
    });
    ext
}
