use std::marker::PhantomData;
use std::sync::Arc;

use rowscan_api::converter::ArrayDecoder;
use rowscan_api::cursor::{AsyncCursor, Cursor};
use rowscan_api::mapping::{ColumnPlan, TypeMap};
use rowscan_api::record::Record;
use rowscan_api::value::Row;

use crate::array::decoder_for;
use crate::cache::ScanCache;
use crate::config::{OneRowPolicy, RowErrorPolicy, ScanConfig};
use crate::error::{RowError, ScanError};
use crate::scan;

/// Entry point: scans cursors into records.
///
/// Holds the configuration, the array decoder and a handle to the shared
/// caches. Cheap to clone; scanners built with `new` share the process-wide
/// cache.
///
/// ```ignore
/// let scanner = Scanner::new(ScanConfig::default());
/// let beers: Vec<Beer> = scanner.scan_all(&mut cursor)?.into_records();
/// ```
#[derive(Clone)]
pub struct Scanner {
    config: ScanConfig,
    cache: Arc<ScanCache>,
    decoder: Arc<dyn ArrayDecoder>,
}

/// Records of a completed scan plus the rows skipped under
/// `rows = "skip_row"`.
#[derive(Debug)]
pub struct ScanOutcome<T> {
    pub records: Vec<T>,
    pub row_errors: Vec<RowError>,
}

impl<T> ScanOutcome<T> {
    /// No row was skipped.
    pub fn is_clean(&self) -> bool {
        self.row_errors.is_empty()
    }

    pub fn into_records(self) -> Vec<T> {
        self.records
    }
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Self {
        let cache = ScanCache::global(config.plan_cache_capacity);
        Self::with_cache(config, cache)
    }

    /// Scanner with a private cache instead of the process-wide one.
    pub fn with_cache(config: ScanConfig, cache: Arc<ScanCache>) -> Self {
        let decoder = decoder_for(&config);
        Self {
            config,
            cache,
            decoder,
        }
    }

    /// Replace the decoder chosen by `arrays`.
    pub fn with_array_decoder(mut self, decoder: Arc<dyn ArrayDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn cache(&self) -> &ScanCache {
        &self.cache
    }

    pub fn array_decoder(&self) -> &dyn ArrayDecoder {
        self.decoder.as_ref()
    }

    /// Reflected layout of `T` (cached).
    pub fn type_map<T: Record>(&self) -> Result<Arc<TypeMap>, ScanError> {
        self.cache.types().get_or_reflect::<T>(self.config.untagged)
    }

    /// Column plan of `T` for `columns` (cached).
    pub fn plan<T: Record>(&self, columns: &[String]) -> Result<Arc<ColumnPlan>, ScanError> {
        let type_map = self.type_map::<T>()?;
        self.cache
            .plans()
            .get_or_bind::<T>(&type_map, columns, self.config.untagged, self.config.columns)
    }

    /// Scan a single row under an existing plan.
    pub fn scan_row<T: Record>(&self, plan: &ColumnPlan, row: Row<'_>) -> Result<T, ScanError> {
        scan::scan_new(plan, row, self.decoder.as_ref())
    }

    /// Lazy row iterator. Structural errors (reflection, binding) are
    /// returned here, before any row is read.
    pub fn rows<'s, 'c, T, C>(&'s self, cursor: &'c mut C) -> Result<Rows<'s, 'c, T, C>, ScanError>
    where
        T: Record,
        C: Cursor + ?Sized,
    {
        let plan = self.plan::<T>(cursor.columns())?;
        Ok(Rows {
            scanner: self,
            cursor,
            plan,
            done: false,
            _record: PhantomData,
        })
    }

    /// Append every row of `cursor` to `out`.
    ///
    /// Returns the skipped rows; always empty under `rows = "fail_fast"`,
    /// where the first bad row is the error.
    pub fn scan_into<T, C, E>(&self, cursor: &mut C, out: &mut E) -> Result<Vec<RowError>, ScanError>
    where
        T: Record,
        C: Cursor + ?Sized,
        E: Extend<T>,
    {
        let mut tally = Tally::new(T::type_name(), self.config.rows);
        for result in self.rows::<T, C>(cursor)? {
            tally.absorb(result, out)?;
        }
        Ok(tally.finish())
    }

    pub fn scan_all<T, C>(&self, cursor: &mut C) -> Result<ScanOutcome<T>, ScanError>
    where
        T: Record,
        C: Cursor + ?Sized,
    {
        let mut records = Vec::new();
        let row_errors = self.scan_into(cursor, &mut records)?;
        Ok(ScanOutcome { records, row_errors })
    }

    /// Exactly one row. Any failure on that row is returned, regardless of
    /// the row error policy.
    pub fn scan_one<T, C>(&self, cursor: &mut C) -> Result<T, ScanError>
    where
        T: Record,
        C: Cursor + ?Sized,
    {
        let plan = self.plan::<T>(cursor.columns())?;
        if !cursor.advance()? {
            return Err(ScanError::NoRows);
        }
        let record = self.scan_row(&plan, cursor.current())?;
        if self.config.one_row == OneRowPolicy::Strict && cursor.advance()? {
            return Err(ScanError::MultipleRows);
        }
        Ok(record)
    }

    /// Async counterpart of [`Scanner::rows`].
    pub fn stream<'s, 'c, T, C>(&'s self, cursor: &'c mut C) -> Result<RowStream<'s, 'c, T, C>, ScanError>
    where
        T: Record,
        C: AsyncCursor + ?Sized,
    {
        let plan = self.plan::<T>(cursor.columns())?;
        Ok(RowStream {
            scanner: self,
            cursor,
            plan,
            done: false,
            _record: PhantomData,
        })
    }

    pub async fn scan_all_async<T, C>(&self, cursor: &mut C) -> Result<ScanOutcome<T>, ScanError>
    where
        T: Record,
        C: AsyncCursor + ?Sized,
    {
        let mut records = Vec::new();
        let mut tally = Tally::new(T::type_name(), self.config.rows);
        let mut stream = self.stream::<T, C>(cursor)?;
        while let Some(result) = stream.next().await {
            tally.absorb(result, &mut records)?;
        }
        Ok(ScanOutcome {
            records,
            row_errors: tally.finish(),
        })
    }

    pub async fn scan_one_async<T, C>(&self, cursor: &mut C) -> Result<T, ScanError>
    where
        T: Record,
        C: AsyncCursor + ?Sized,
    {
        let plan = self.plan::<T>(cursor.columns())?;
        if !cursor.advance().await? {
            return Err(ScanError::NoRows);
        }
        let record = self.scan_row(&plan, cursor.current())?;
        if self.config.one_row == OneRowPolicy::Strict && cursor.advance().await? {
            return Err(ScanError::MultipleRows);
        }
        Ok(record)
    }

    /// Whether `error` ends the scan under the configured row policy.
    fn is_fatal(&self, error: &ScanError) -> bool {
        !error.is_row_level() || self.config.rows == RowErrorPolicy::FailFast
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("config", &self.config)
            .field("array_decoder", &self.decoder.name())
            .finish()
    }
}

/// Iterator over the records of a cursor, see [`Scanner::rows`].
///
/// Fused: after a fatal error or exhaustion it only returns `None` and the
/// cursor is not advanced again. Row-level errors under
/// `rows = "skip_row"` are yielded and iteration continues.
pub struct Rows<'s, 'c, T, C: ?Sized> {
    scanner: &'s Scanner,
    cursor: &'c mut C,
    plan: Arc<ColumnPlan>,
    done: bool,
    _record: PhantomData<fn() -> T>,
}

impl<T, C: ?Sized> Rows<'_, '_, T, C> {
    pub fn plan(&self) -> &ColumnPlan {
        &self.plan
    }
}

impl<T: Record, C: Cursor + ?Sized> Iterator for Rows<'_, '_, T, C> {
    type Item = Result<T, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.cursor.advance() {
            Ok(true) => {}
            Ok(false) => {
                self.done = true;
                return None;
            }
            Err(e) => {
                self.done = true;
                return Some(Err(e.into()));
            }
        }

        let result = self.scanner.scan_row(&self.plan, self.cursor.current());
        if let Err(e) = &result {
            self.done = self.scanner.is_fatal(e);
        }
        Some(result)
    }
}

impl<T: Record, C: Cursor + ?Sized> std::iter::FusedIterator for Rows<'_, '_, T, C> {}

/// Async row source, see [`Scanner::stream`]. Same fusing rules as
/// [`Rows`].
pub struct RowStream<'s, 'c, T, C: ?Sized> {
    scanner: &'s Scanner,
    cursor: &'c mut C,
    plan: Arc<ColumnPlan>,
    done: bool,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record, C: AsyncCursor + ?Sized> RowStream<'_, '_, T, C> {
    pub fn plan(&self) -> &ColumnPlan {
        &self.plan
    }

    pub async fn next(&mut self) -> Option<Result<T, ScanError>> {
        if self.done {
            return None;
        }
        match self.cursor.advance().await {
            Ok(true) => {}
            Ok(false) => {
                self.done = true;
                return None;
            }
            Err(e) => {
                self.done = true;
                return Some(Err(e.into()));
            }
        }

        let result = self.scanner.scan_row(&self.plan, self.cursor.current());
        if let Err(e) = &result {
            self.done = self.scanner.is_fatal(e);
        }
        Some(result)
    }
}

/// Bookkeeping shared by the collecting entry points.
struct Tally {
    record: &'static str,
    skip_rows: bool,
    row: u64,
    scanned: u64,
    row_errors: Vec<RowError>,
}

impl Tally {
    fn new(record: &'static str, policy: RowErrorPolicy) -> Self {
        Self {
            record,
            skip_rows: policy == RowErrorPolicy::SkipRow,
            row: 0,
            scanned: 0,
            row_errors: Vec::new(),
        }
    }

    /// Under fail-fast, or for any structural or cursor error, the row
    /// iterator has already stopped and the error is returned.
    fn absorb<T, E: Extend<T>>(&mut self, result: Result<T, ScanError>, out: &mut E) -> Result<(), ScanError> {
        let row = self.row;
        self.row += 1;
        match result {
            Ok(record) => {
                out.extend(Some(record));
                self.scanned += 1;
                Ok(())
            }
            Err(error) if error.is_row_level() && self.skip_rows => {
                tracing::warn!(record = %self.record, row, error = %error, "skipping row");
                self.row_errors.push(RowError { row, error });
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    fn finish(self) -> Vec<RowError> {
        tracing::debug!(
            record = %self.record,
            scanned = self.scanned,
            skipped = self.row_errors.len(),
            "scan complete"
        );
        self.row_errors
    }
}
