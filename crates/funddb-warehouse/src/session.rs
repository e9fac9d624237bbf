//! Transactional access to the fund registry and price history.

use ::duckdb::ToSql;

use crate::duckdb::PooledConnection;
use crate::records::{FundChanges, FundRecord, PriceRecord, UpsertOutcome};
use crate::WarehouseError;

const FUND_COLUMNS: &str = "id, name, url, fetch_id";
const PRICE_COLUMNS: &str = "id, date, value, net_assets";

/// One open transaction.
///
/// A session that is dropped without [`commit`](Self::commit) or
/// [`finish`](Self::finish) rolls back.
pub struct Session {
    connection: PooledConnection,
    show_sql: bool,
    open: bool,
}

impl Session {
    pub(crate) fn begin(connection: PooledConnection, show_sql: bool) -> Result<Self, WarehouseError> {
        let mut session = Self {
            connection,
            show_sql,
            open: false,
        };
        session.batch("BEGIN TRANSACTION")?;
        session.open = true;
        Ok(session)
    }

    pub fn commit(mut self) -> Result<(), WarehouseError> {
        self.open = false;
        if let Err(error) = self.batch("COMMIT") {
            let _ = self.connection.execute_batch("ROLLBACK");
            return Err(error);
        }
        Ok(())
    }

    pub fn rollback(mut self) -> Result<(), WarehouseError> {
        self.open = false;
        self.batch("ROLLBACK")
    }

    /// Commit when `result` is `Ok`, roll back otherwise.
    pub fn finish<T, E>(self, result: Result<T, E>) -> Result<T, E>
    where
        E: From<WarehouseError>,
    {
        match result {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback_error) = self.rollback() {
                    tracing::warn!(error = %rollback_error, "rollback failed");
                }
                Err(error)
            }
        }
    }

    pub fn count_funds(&self, ids: &[String]) -> Result<usize, WarehouseError> {
        let sql = format!("SELECT COUNT(*) FROM funds{}", id_filter(ids.len()));
        let params = id_params(ids);
        self.count(&sql, params.as_slice())
    }

    /// Load one page of funds ordered by id, optionally restricted to `ids`.
    pub fn fund_page(
        &self,
        ids: &[String],
        limit: usize,
        offset: usize,
    ) -> Result<Vec<FundRecord>, WarehouseError> {
        let sql = format!(
            "SELECT {FUND_COLUMNS} FROM funds{} ORDER BY id LIMIT ? OFFSET ?",
            id_filter(ids.len())
        );
        let limit = to_sql_int(limit);
        let offset = to_sql_int(offset);
        let mut params = id_params(ids);
        params.push(&limit);
        params.push(&offset);
        self.query_funds(&sql, params.as_slice())
    }

    pub fn list_funds(&self) -> Result<Vec<FundRecord>, WarehouseError> {
        let sql = format!("SELECT {FUND_COLUMNS} FROM funds ORDER BY id");
        self.query_funds(&sql, &[])
    }

    pub fn get_fund(&self, id: &str) -> Result<Option<FundRecord>, WarehouseError> {
        let sql = format!("SELECT {FUND_COLUMNS} FROM funds WHERE id = ?");
        let params: [&dyn ToSql; 1] = [&id];
        Ok(self
            .query_funds(&sql, params.as_slice())?
            .into_iter()
            .next())
    }

    /// Update the fund by primary key, inserting it when no row matched.
    pub fn upsert_fund(&self, fund: &FundRecord) -> Result<UpsertOutcome, WarehouseError> {
        let params: [&dyn ToSql; 4] = [&fund.name, &fund.url, &fund.fetch_id, &fund.id];
        let updated = self.execute(
            "UPDATE funds SET name = ?, url = ?, fetch_id = ? WHERE id = ?",
            params.as_slice(),
        )?;
        match updated {
            0 => {
                self.insert_fund(fund)?;
                Ok(UpsertOutcome::Inserted)
            }
            1 => Ok(UpsertOutcome::Updated),
            actual => Err(WarehouseError::invariant("funds", "update", actual)),
        }
    }

    pub fn insert_fund(&self, fund: &FundRecord) -> Result<(), WarehouseError> {
        let params: [&dyn ToSql; 4] = [&fund.id, &fund.name, &fund.url, &fund.fetch_id];
        let inserted = self.execute(
            "INSERT INTO funds (id, name, url, fetch_id) VALUES (?, ?, ?, ?)",
            params.as_slice(),
        )?;
        expect_one("funds", "insert", inserted)
    }

    pub fn modify_fund(&self, id: &str, changes: &FundChanges) -> Result<FundRecord, WarehouseError> {
        let mut fund = self
            .get_fund(id)?
            .ok_or_else(|| WarehouseError::NotFound(format!("no funds for id: {id}")))?;
        if changes.is_empty() {
            return Ok(fund);
        }
        changes.apply(&mut fund);

        let params: [&dyn ToSql; 4] = [&fund.name, &fund.url, &fund.fetch_id, &fund.id];
        let updated = self.execute(
            "UPDATE funds SET name = ?, url = ?, fetch_id = ? WHERE id = ?",
            params.as_slice(),
        )?;
        expect_one("funds", "update", updated)?;
        Ok(fund)
    }

    /// Delete a fund together with its price history.
    ///
    /// Returns the number of price rows removed.
    pub fn delete_fund(&self, id: &str) -> Result<usize, WarehouseError> {
        let params: [&dyn ToSql; 1] = [&id];
        let prices = self.execute("DELETE FROM prices WHERE id = ?", params.as_slice())?;
        match self.execute("DELETE FROM funds WHERE id = ?", params.as_slice())? {
            0 => Err(WarehouseError::NotFound(format!("no funds for id: {id}"))),
            1 => Ok(prices),
            actual => Err(WarehouseError::invariant("funds", "delete", actual)),
        }
    }

    pub fn get_price(&self, fund_id: &str, date: &str) -> Result<Option<PriceRecord>, WarehouseError> {
        let sql = format!("SELECT {PRICE_COLUMNS} FROM prices WHERE id = ? AND date = ?");
        let params: [&dyn ToSql; 2] = [&fund_id, &date];
        Ok(self
            .query_prices(&sql, params.as_slice())?
            .into_iter()
            .next())
    }

    /// Reconcile `price` with the stored row for `(fund_id, date)`.
    pub fn upsert_price(&self, price: &PriceRecord) -> Result<UpsertOutcome, WarehouseError> {
        let Some(current) = self.get_price(&price.fund_id, &price.date)? else {
            self.insert_price(price)?;
            return Ok(UpsertOutcome::Inserted);
        };

        if !current.differs_from(price) {
            tracing::debug!(
                fund_id = %price.fund_id,
                date = %price.date,
                value = price.value,
                "price unchanged, skipped"
            );
            return Ok(UpsertOutcome::Unchanged);
        }

        let updated = match &price.net_assets {
            Some(net_assets) => {
                let params: [&dyn ToSql; 4] = [&price.value, net_assets, &price.fund_id, &price.date];
                self.execute(
                    "UPDATE prices SET value = ?, net_assets = ? WHERE id = ? AND date = ?",
                    params.as_slice(),
                )?
            }
            None => {
                let params: [&dyn ToSql; 3] = [&price.value, &price.fund_id, &price.date];
                self.execute(
                    "UPDATE prices SET value = ? WHERE id = ? AND date = ?",
                    params.as_slice(),
                )?
            }
        };
        expect_one("prices", "update", updated)?;
        Ok(UpsertOutcome::Updated)
    }

    /// Stored prices of one fund, newest first.
    pub fn list_prices(
        &self,
        fund_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<PriceRecord>, WarehouseError> {
        let mut sql = format!("SELECT {PRICE_COLUMNS} FROM prices WHERE id = ? ORDER BY date DESC");
        let limit = limit.map(to_sql_int);
        let mut params: Vec<&dyn ToSql> = vec![&fund_id];
        if let Some(limit) = &limit {
            sql.push_str(" LIMIT ?");
            params.push(limit);
        }
        self.query_prices(&sql, params.as_slice())
    }

    pub fn count_prices(&self, fund_id: &str) -> Result<usize, WarehouseError> {
        let params: [&dyn ToSql; 1] = [&fund_id];
        self.count("SELECT COUNT(*) FROM prices WHERE id = ?", params.as_slice())
    }

    fn insert_price(&self, price: &PriceRecord) -> Result<(), WarehouseError> {
        let params: [&dyn ToSql; 1] = [&price.fund_id];
        if self.count("SELECT COUNT(*) FROM funds WHERE id = ?", params.as_slice())? == 0 {
            return Err(WarehouseError::NotFound(format!(
                "no funds for id: {}",
                price.fund_id
            )));
        }

        let params: [&dyn ToSql; 4] = [&price.fund_id, &price.date, &price.value, &price.net_assets];
        let inserted = self.execute(
            "INSERT INTO prices (id, date, value, net_assets) VALUES (?, ?, ?, ?)",
            params.as_slice(),
        )?;
        expect_one("prices", "insert", inserted)
    }

    fn query_funds(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<FundRecord>, WarehouseError> {
        self.log_sql(sql);
        let mut statement = self.connection.prepare(sql)?;
        let funds = statement
            .query_map(params, FundRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(funds)
    }

    fn query_prices(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<PriceRecord>, WarehouseError> {
        self.log_sql(sql);
        let mut statement = self.connection.prepare(sql)?;
        let prices = statement
            .query_map(params, PriceRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(prices)
    }

    fn count(&self, sql: &str, params: &[&dyn ToSql]) -> Result<usize, WarehouseError> {
        self.log_sql(sql);
        let count: i64 = self.connection.query_row(sql, params, |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> Result<usize, WarehouseError> {
        self.log_sql(sql);
        Ok(self.connection.execute(sql, params)?)
    }

    fn batch(&self, sql: &str) -> Result<(), WarehouseError> {
        self.log_sql(sql);
        Ok(self.connection.execute_batch(sql)?)
    }

    fn log_sql(&self, sql: &str) {
        if self.show_sql {
            tracing::info!(target: "funddb::sql", "{sql}");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.open {
            tracing::debug!("session dropped while open, rolling back");
            let _ = self.connection.execute_batch("ROLLBACK");
        }
    }
}

fn expect_one(table: &'static str, operation: &'static str, actual: usize) -> Result<(), WarehouseError> {
    if actual == 1 {
        Ok(())
    } else {
        Err(WarehouseError::invariant(table, operation, actual))
    }
}

fn id_filter(count: usize) -> String {
    if count == 0 {
        return String::new();
    }
    let placeholders = vec!["?"; count].join(", ");
    format!(" WHERE id IN ({placeholders})")
}

fn id_params(ids: &[String]) -> Vec<&dyn ToSql> {
    ids.iter().map(|id| id as &dyn ToSql).collect()
}

fn to_sql_int(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
