//! Transaction relevance filter.

use numa_shared::{Address, ChainTransaction};

/// True iff the transaction is addressed to the target contract.
///
/// Addresses are normalized at parse time, so the comparison is
/// case-insensitive by construction.  Contract-creation transactions
/// (no recipient) are never relevant.
pub fn is_relevant(tx: &ChainTransaction, contract: &Address) -> bool {
    tx.to.as_ref() == Some(contract)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use numa_shared::TxHash;

    fn tx(to: Option<Address>) -> ChainTransaction {
        ChainTransaction {
            hash: TxHash([0; 32]),
            from: Address([1; 20]),
            to,
            input: Bytes::new(),
        }
    }

    #[test]
    fn matches_contract_recipient() {
        let contract = Address([0xcc; 20]);
        assert!(is_relevant(&tx(Some(contract)), &contract));
        assert!(!is_relevant(&tx(Some(Address([0xdd; 20]))), &contract));
        assert!(!is_relevant(&tx(None), &contract));
    }

    #[test]
    fn hex_casing_does_not_matter() {
        let contract = Address::from_hex("0xABCDEF0123456789abcdef0123456789abcdef01").unwrap();
        let lower = Address::from_hex("0xabcdef0123456789abcdef0123456789abcdef01").unwrap();
        assert!(is_relevant(&tx(Some(lower)), &contract));
    }
}
