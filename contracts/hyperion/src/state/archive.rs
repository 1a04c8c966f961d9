use cosmwasm_std::{Empty, Order, StdResult, Storage};
use cw_storage_plus::{Bound, Deque, Index, IndexList, IndexedMap, Item, Map, MultiIndex};

use crate::types::{EthAddress, TransferTx};

/// Records kept in the ring of latest transfers.
pub const LAST_TRANSACTIONS_LEN: u32 = 100;

const ARCHIVE_KEY: &str = "archive";
const ARCHIVE_SENDER_KEY: &str = "archive__sender";
const ARCHIVE_DEST_KEY: &str = "archive__dest";

pub(crate) const ARCHIVE_SEQ: Item<u64> = Item::new("archive_seq");
/// Record ids of the latest transfers, oldest first
pub(crate) const LAST_TRANSACTIONS: Deque<u64> = Deque::new("archive_last");
/// Counterparty addresses whose deposits are diverted to the community pool
pub(crate) const BLACKLIST: Map<&[u8], Empty> = Map::new("eth_blacklist");

pub struct TransferTxIndexes<'a> {
    pub sender: MultiIndex<'a, String, TransferTx, u64>,
    pub dest: MultiIndex<'a, String, TransferTx, u64>,
}

impl IndexList<TransferTx> for TransferTxIndexes<'_> {
    fn get_indexes(&'_ self) -> Box<dyn Iterator<Item = &'_ dyn Index<TransferTx>> + '_> {
        let v: Vec<&dyn Index<TransferTx>> = vec![&self.sender, &self.dest];
        Box::new(v.into_iter())
    }
}

/// Finalized transfers by record id, indexed by sender and destination.
///
/// Addresses are indexed lower-cased so counterparty addresses match regardless
/// of their checksum casing.
pub fn archive<'a>() -> IndexedMap<u64, TransferTx, TransferTxIndexes<'a>> {
    let indexes = TransferTxIndexes {
        sender: MultiIndex::new(
            |_, tx| tx.sender.to_lowercase(),
            ARCHIVE_KEY,
            ARCHIVE_SENDER_KEY,
        ),
        dest: MultiIndex::new(
            |_, tx| tx.dest_address.to_lowercase(),
            ARCHIVE_KEY,
            ARCHIVE_DEST_KEY,
        ),
    };
    IndexedMap::new(ARCHIVE_KEY, indexes)
}

/// Stores a record and pushes it into the ring of latest transfers.
pub fn archive_transfer(storage: &mut dyn Storage, tx: &TransferTx) -> StdResult<u64> {
    let id = ARCHIVE_SEQ.may_load(storage)?.unwrap_or_default() + 1;
    ARCHIVE_SEQ.save(storage, &id)?;
    archive().save(storage, id, tx)?;

    LAST_TRANSACTIONS.push_back(storage, &id)?;
    while LAST_TRANSACTIONS.len(storage)? > LAST_TRANSACTIONS_LEN {
        LAST_TRANSACTIONS.pop_front(storage)?;
    }
    Ok(id)
}

/// Transfers sent or received by `address`, most recent first.
pub fn transfer_history(
    storage: &dyn Storage,
    address: &str,
    start_before: Option<u64>,
    limit: usize,
) -> StdResult<Vec<(u64, TransferTx)>> {
    let address = address.to_lowercase();
    let map = archive();
    let max = start_before.map(Bound::exclusive);
    let mut records: Vec<(u64, TransferTx)> = map
        .idx
        .sender
        .prefix(address.clone())
        .range(storage, None, max.clone(), Order::Descending)
        .take(limit)
        .collect::<StdResult<_>>()?;
    let received: Vec<(u64, TransferTx)> = map
        .idx
        .dest
        .prefix(address)
        .range(storage, None, max, Order::Descending)
        .take(limit)
        .collect::<StdResult<_>>()?;

    for (id, tx) in received {
        if !records.iter().any(|(seen, _)| *seen == id) {
            records.push((id, tx));
        }
    }
    records.sort_by(|a, b| b.0.cmp(&a.0));
    records.truncate(limit);
    Ok(records)
}

/// The latest transfers, most recent first.
pub fn last_transactions(storage: &dyn Storage, limit: usize) -> StdResult<Vec<TransferTx>> {
    let ids: Vec<u64> = LAST_TRANSACTIONS.iter(storage)?.collect::<StdResult<_>>()?;
    ids.into_iter()
        .rev()
        .take(limit)
        .map(|id| archive().load(storage, id))
        .collect()
}

/// Removes every record of a bridge instance.
pub fn delete_archive(storage: &mut dyn Storage, hyperion_id: u64) -> StdResult<()> {
    let map = archive();
    let ids: Vec<u64> = map
        .range(storage, None, None, Order::Ascending)
        .filter_map(|item| match item {
            Ok((id, tx)) if tx.hyperion_id == hyperion_id => Some(Ok(id)),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
        .collect::<StdResult<_>>()?;
    for id in ids {
        map.remove(storage, id)?;
    }

    let kept: Vec<u64> = LAST_TRANSACTIONS.iter(storage)?.collect::<StdResult<_>>()?;
    while LAST_TRANSACTIONS.pop_front(storage)?.is_some() {}
    for id in kept {
        if map.may_load(storage, id)?.is_some() {
            LAST_TRANSACTIONS.push_back(storage, &id)?;
        }
    }
    Ok(())
}

pub fn is_blacklisted(storage: &dyn Storage, addr: &EthAddress) -> bool {
    BLACKLIST.has(storage, addr.as_bytes())
}

pub fn blacklist(storage: &mut dyn Storage, addr: &EthAddress) -> StdResult<()> {
    BLACKLIST.save(storage, addr.as_bytes(), &Empty {})
}

pub fn revoke_blacklist(storage: &mut dyn Storage, addr: &EthAddress) {
    BLACKLIST.remove(storage, addr.as_bytes());
}

pub fn blacklisted_addresses(storage: &dyn Storage) -> StdResult<Vec<EthAddress>> {
    BLACKLIST
        .keys(storage, None, None, Order::Ascending)
        .map(|key| {
            let key = key?;
            EthAddress::from_slice(&key)
                .map_err(|e| cosmwasm_std::StdError::generic_err(e.to_string()))
        })
        .collect()
}
