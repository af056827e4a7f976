// SQLite store for Binance account history
//
// One table per record type, keyed by each record's natural unique id.
// Writes are INSERT OR REPLACE, so re-fetching an overlapping time window
// never duplicates rows and a later run picks up server-side status
// transitions. Rows are only ever inserted or overwritten, never deleted.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::debug;

use crate::binance::{ConvertTrade, Deposit, FiatWithdrawal};

pub struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    /// Open (or create) the database file and ensure the schema exists
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;

        Self::init(conn)
    }

    /// In-memory store, used by tests
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let store = Self { conn };
        store.create_tables()?;
        debug!("History store initialized");

        Ok(store)
    }

    fn create_tables(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS deposits (
                id TEXT PRIMARY KEY,
                amount REAL NOT NULL,
                coin TEXT NOT NULL,
                network TEXT,
                status INTEGER,
                address TEXT,
                address_tag TEXT,
                tx_id TEXT,
                insert_time INTEGER NOT NULL,
                transfer_type INTEGER,
                confirm_times TEXT,
                unlock_confirm INTEGER,
                wallet_type INTEGER
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS fiat_withdrawals (
                order_no TEXT PRIMARY KEY,
                fiat_currency TEXT NOT NULL,
                indicated_amount REAL NOT NULL,
                amount REAL NOT NULL,
                total_fee REAL NOT NULL,
                method TEXT,
                status TEXT,
                create_time INTEGER NOT NULL,
                update_time INTEGER
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS convert_trades (
                quote_id TEXT PRIMARY KEY,
                order_id INTEGER NOT NULL,
                order_status TEXT,
                from_asset TEXT NOT NULL,
                from_amount REAL NOT NULL,
                to_asset TEXT NOT NULL,
                to_amount REAL NOT NULL,
                ratio REAL,
                inverse_ratio REAL,
                create_time INTEGER NOT NULL,
                order_type TEXT,
                side TEXT
            )",
            [],
        )?;

        debug!("Database schema created/verified");
        Ok(())
    }

    /// Upsert a batch of deposits in one transaction. Safe to call with
    /// overlapping or identical batches.
    pub fn upsert_deposits(&mut self, batch: &[Deposit]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO deposits
                 (id, amount, coin, network, status, address, address_tag, tx_id,
                  insert_time, transfer_type, confirm_times, unlock_confirm, wallet_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            )?;
            for d in batch {
                stmt.execute(params![
                    d.id,
                    d.amount,
                    d.coin,
                    d.network,
                    d.status,
                    d.address,
                    d.address_tag,
                    d.tx_id,
                    d.insert_time,
                    d.transfer_type,
                    d.confirm_times,
                    d.unlock_confirm,
                    d.wallet_type,
                ])?;
            }
        }
        tx.commit()?;

        debug!("Upserted {} deposits", batch.len());
        Ok(batch.len())
    }

    /// Upsert a batch of fiat withdrawal orders in one transaction
    pub fn upsert_fiat_withdrawals(&mut self, batch: &[FiatWithdrawal]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO fiat_withdrawals
                 (order_no, fiat_currency, indicated_amount, amount, total_fee,
                  method, status, create_time, update_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for w in batch {
                stmt.execute(params![
                    w.order_no,
                    w.fiat_currency,
                    w.indicated_amount,
                    w.amount,
                    w.total_fee,
                    w.method,
                    w.status,
                    w.create_time,
                    w.update_time,
                ])?;
            }
        }
        tx.commit()?;

        debug!("Upserted {} fiat withdrawals", batch.len());
        Ok(batch.len())
    }

    /// Upsert a batch of convert trades in one transaction
    pub fn upsert_convert_trades(&mut self, batch: &[ConvertTrade]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO convert_trades
                 (quote_id, order_id, order_status, from_asset, from_amount,
                  to_asset, to_amount, ratio, inverse_ratio, create_time,
                  order_type, side)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for t in batch {
                stmt.execute(params![
                    t.quote_id,
                    t.order_id,
                    t.order_status,
                    t.from_asset,
                    t.from_amount,
                    t.to_asset,
                    t.to_amount,
                    t.ratio,
                    t.inverse_ratio,
                    t.create_time,
                    t.order_type,
                    t.side,
                ])?;
            }
        }
        tx.commit()?;

        debug!("Upserted {} convert trades", batch.len());
        Ok(batch.len())
    }

    pub fn deposit_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM deposits", [], |row| row.get(0))?)
    }

    pub fn fiat_withdrawal_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM fiat_withdrawals", [], |row| {
                row.get(0)
            })?)
    }

    pub fn convert_trade_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM convert_trades", [], |row| row.get(0))?)
    }

    /// Load a single deposit row by id
    pub fn get_deposit(&self, id: &str) -> Result<Option<Deposit>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, amount, coin, network, status, address, address_tag, tx_id,
                    insert_time, transfer_type, confirm_times, unlock_confirm, wallet_type
             FROM deposits WHERE id = ?1",
        )?;

        let deposit = stmt.query_row(params![id], |row| {
            Ok(Deposit {
                id: row.get(0)?,
                amount: row.get(1)?,
                coin: row.get(2)?,
                network: row.get(3)?,
                status: row.get(4)?,
                address: row.get(5)?,
                address_tag: row.get(6)?,
                tx_id: row.get(7)?,
                insert_time: row.get(8)?,
                transfer_type: row.get(9)?,
                confirm_times: row.get(10)?,
                unlock_confirm: row.get(11)?,
                wallet_type: row.get(12)?,
            })
        });

        match deposit {
            Ok(d) => Ok(Some(d)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All deposit ids, sorted
    pub fn deposit_ids(&self) -> Result<Vec<String>> {
        self.ids("SELECT id FROM deposits ORDER BY id")
    }

    /// All fiat withdrawal order numbers, sorted
    pub fn fiat_withdrawal_order_nos(&self) -> Result<Vec<String>> {
        self.ids("SELECT order_no FROM fiat_withdrawals ORDER BY order_no")
    }

    /// All convert trade quote ids, sorted
    pub fn convert_trade_quote_ids(&self) -> Result<Vec<String>> {
        self.ids("SELECT quote_id FROM convert_trades ORDER BY quote_id")
    }

    fn ids(&self, query: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(query)?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deposit(id: &str, amount: f64, insert_time: i64) -> Deposit {
        Deposit {
            id: id.to_string(),
            amount,
            coin: "BTC".to_string(),
            network: "BTC".to_string(),
            status: 1,
            address: "bc1qtest".to_string(),
            address_tag: String::new(),
            tx_id: format!("tx-{}", id),
            insert_time,
            transfer_type: 0,
            confirm_times: "2/2".to_string(),
            unlock_confirm: 0,
            wallet_type: 0,
        }
    }

    fn withdrawal(order_no: &str) -> FiatWithdrawal {
        FiatWithdrawal {
            order_no: order_no.to_string(),
            fiat_currency: "EUR".to_string(),
            indicated_amount: 100.0,
            amount: 99.0,
            total_fee: 1.0,
            method: "BankAccount".to_string(),
            status: "Successful".to_string(),
            create_time: 1_675_000_000_000,
            update_time: Some(1_675_000_100_000),
        }
    }

    fn trade(quote_id: &str) -> ConvertTrade {
        ConvertTrade {
            quote_id: quote_id.to_string(),
            order_id: 42,
            order_status: "SUCCESS".to_string(),
            from_asset: "USDT".to_string(),
            from_amount: 20.0,
            to_asset: "BNB".to_string(),
            to_amount: 0.06,
            ratio: 0.003,
            inverse_ratio: 333.33,
            create_time: 1_675_000_000_000,
            order_type: Some("MARKET".to_string()),
            side: Some("BUY".to_string()),
        }
    }

    #[test]
    fn test_repeated_upsert_does_not_duplicate() {
        let mut store = HistoryStore::open_in_memory().unwrap();
        let batch = vec![deposit("D1", 1.0, 1_000), deposit("D2", 2.0, 2_000)];

        store.upsert_deposits(&batch).unwrap();
        store.upsert_deposits(&batch).unwrap();

        assert_eq!(store.deposit_count().unwrap(), 2);
        assert_eq!(store.deposit_ids().unwrap(), vec!["D1", "D2"]);
    }

    #[test]
    fn test_upsert_overwrites_existing_row() {
        let mut store = HistoryStore::open_in_memory().unwrap();

        store.upsert_deposits(&[deposit("D1", 1.0, 1_000)]).unwrap();
        store.upsert_deposits(&[deposit("D1", 5.0, 1_000)]).unwrap();

        assert_eq!(store.deposit_count().unwrap(), 1);
        let row = store.get_deposit("D1").unwrap().unwrap();
        assert_eq!(row.amount, 5.0);
    }

    #[test]
    fn test_overlapping_batches_are_idempotent() {
        let mut store = HistoryStore::open_in_memory().unwrap();

        store
            .upsert_deposits(&[deposit("D1", 1.0, 1_000), deposit("D2", 2.0, 2_000)])
            .unwrap();
        store
            .upsert_deposits(&[deposit("D2", 2.0, 2_000), deposit("D3", 3.0, 3_000)])
            .unwrap();

        assert_eq!(store.deposit_ids().unwrap(), vec!["D1", "D2", "D3"]);
    }

    #[test]
    fn test_fiat_withdrawals_keyed_by_order_no() {
        let mut store = HistoryStore::open_in_memory().unwrap();

        store
            .upsert_fiat_withdrawals(&[withdrawal("W1"), withdrawal("W2")])
            .unwrap();
        store.upsert_fiat_withdrawals(&[withdrawal("W1")]).unwrap();

        assert_eq!(store.fiat_withdrawal_count().unwrap(), 2);
    }

    #[test]
    fn test_fiat_withdrawal_null_update_time() {
        let mut store = HistoryStore::open_in_memory().unwrap();
        let mut w = withdrawal("W1");
        w.update_time = None;

        store.upsert_fiat_withdrawals(&[w]).unwrap();
        assert_eq!(store.fiat_withdrawal_count().unwrap(), 1);
    }

    #[test]
    fn test_convert_trades_keyed_by_quote_id() {
        let mut store = HistoryStore::open_in_memory().unwrap();

        store
            .upsert_convert_trades(&[trade("Q1"), trade("Q2")])
            .unwrap();
        store.upsert_convert_trades(&[trade("Q2")]).unwrap();

        assert_eq!(store.convert_trade_quote_ids().unwrap(), vec!["Q1", "Q2"]);
    }

    #[test]
    fn test_empty_batch_is_a_noop() {
        let mut store = HistoryStore::open_in_memory().unwrap();
        assert_eq!(store.upsert_deposits(&[]).unwrap(), 0);
        assert_eq!(store.deposit_count().unwrap(), 0);
    }

    #[test]
    fn test_reopen_persists_rows() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("history.db");

        {
            let mut store = HistoryStore::open(&db_path).unwrap();
            store.upsert_deposits(&[deposit("D1", 1.0, 1_000)]).unwrap();
        }

        let store = HistoryStore::open(&db_path).unwrap();
        assert_eq!(store.deposit_count().unwrap(), 1);
    }
}
