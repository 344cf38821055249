//! Mock runtime for energy agreements tests.

#![cfg(test)]

use crate as pallet_energy_agreements;
use frame_support::{
    derive_impl, parameter_types,
    traits::{ConstU32, ConstU64, Randomness},
    PalletId,
};
use pallet_balances::AccountData;
use sp_core::H256;
use sp_runtime::BuildStorage;

type Block = frame_system::mocking::MockBlock<Test>;

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
        Offers: pallet_energy_offers,
        Escrow: pallet_milestone_escrow,
        EnergyAgreements: pallet_energy_agreements,
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

parameter_types! {
    pub const OpenRegistration: bool = true;
    pub const EscrowPalletId: PalletId = PalletId(*b"nrg/escr");
}

impl pallet_market_roles::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type WeightInfo = ();
    type AdminOrigin = frame_system::EnsureRoot<u64>;
    type OpenRegistration = OpenRegistration;
}

impl pallet_energy_offers::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type WeightInfo = ();
    type Currency = Balances;
    type Roles = Roles;
    type TimeProvider = Timestamp;
    type Randomness = TestRandomness;
    type MaxActiveOffers = ConstU32<16>;
    type MaxOffersPerUser = ConstU32<8>;
    type MaxNegotiationMessages = ConstU32<8>;
    type MaxNoteLength = ConstU32<32>;
}

impl pallet_milestone_escrow::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type Currency = Balances;
    type PalletId = EscrowPalletId;
}

/// One hour to fund.
pub const FUNDING_WINDOW: u64 = 3_600;
/// Two hours to contest a report.
pub const DISPUTE_PERIOD: u64 = 7_200;

impl pallet_energy_agreements::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type WeightInfo = ();
    type Currency = Balances;
    type Offers = Offers;
    type Escrow = Escrow;
    type Roles = Roles;
    type TimeProvider = Timestamp;
    type FundingWindow = ConstU64<FUNDING_WINDOW>;
    type DisputePeriod = ConstU64<DISPUTE_PERIOD>;
    type MaxReasonLength = ConstU32<32>;
    type MaxAgreementsPerUser = ConstU32<4>;
}

pub const ADMIN: u64 = 1;
pub const MODERATOR: u64 = 2;
/// Seller in the standard trade.
pub const ALICE: u64 = 3;
/// Buyer in the standard trade.
pub const BOB: u64 = 4;
/// Registered, but too poor to fund a 480 trade.
pub const CHARLIE: u64 = 5;
pub const STRANGER: u64 = 9;

pub const INITIAL_BALANCE: u64 = 1_000;
pub const CHARLIE_BALANCE: u64 = 100;

pub const START_SECS: u64 = 1_700_000_000;

pub fn set_time(secs: u64) {
    Timestamp::set_timestamp(secs * 1_000);
}

pub fn new_test_ext() -> sp_io::TestExternalities {
    let mut storage = frame_system::GenesisConfig::<Test>::default()
        .build_storage()
        .unwrap();

    pallet_balances::GenesisConfig::<Test> {
        balances: vec![
            (ALICE, INITIAL_BALANCE),
            (BOB, INITIAL_BALANCE),
            (CHARLIE, CHARLIE_BALANCE),
            (STRANGER, INITIAL_BALANCE),
        ],
        dev_accounts: None,
    }
    .assimilate_storage(&mut storage)
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
