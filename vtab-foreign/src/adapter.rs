//! Restricted table function over a table in a foreign database.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace, warn};
use vtab_expr::{DelimitedSqlRenderer, Restriction, RestrictionRenderer, quote_identifier};
use vtab_result::{Error, Result};
use vtab_scan::{
    CursorState, ForwardingCursor, ProjectionMap, RestrictedScan, RowCursor, ScanCosting,
    ScanSetup,
};
use vtab_types::{ColumnSchema, ScalarKind, ScalarValue};

use crate::cache::ConnectionCache;
use crate::connection::{ConnectionFactory, ForeignConnection, Ownership};

type ForeignCursor = ForwardingCursor<Box<dyn RowCursor + Send>, ProjectionMap>;

/// Which foreign table an adapter reads and how restrictions are rendered for
/// it.
#[derive(Clone)]
pub struct ForeignTableConfig {
    /// Schema qualifying the table in the foreign database.
    pub foreign_schema: Option<String>,
    pub foreign_table: String,
    /// Columns exposed to the engine, in declared order. Each name is also
    /// the column's name in the foreign table.
    pub columns: Vec<String>,
    pub renderer: Arc<dyn RestrictionRenderer>,
}

impl fmt::Debug for ForeignTableConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignTableConfig")
            .field("foreign_schema", &self.foreign_schema)
            .field("foreign_table", &self.foreign_table)
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

impl ForeignTableConfig {
    pub fn new<S: Into<String>>(
        foreign_table: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            foreign_schema: None,
            foreign_table: foreign_table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            renderer: Arc::new(DelimitedSqlRenderer),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.foreign_schema = Some(schema.into());
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn RestrictionRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Delimited, schema-qualified table reference.
    pub fn qualified_table(&self) -> String {
        match &self.foreign_schema {
            Some(schema) => format!(
                "{}.{}",
                quote_identifier(schema),
                quote_identifier(&self.foreign_table)
            ),
            None => quote_identifier(&self.foreign_table),
        }
    }
}

/// Where the adapter gets its connection.
#[derive(Clone)]
pub enum ConnectionSource {
    /// Resolved through the shared cache on the first `next()`. Cached
    /// connections are never closed by the adapter.
    Url {
        url: String,
        cache: Arc<ConnectionCache>,
        factory: Arc<dyn ConnectionFactory>,
    },
    /// A connection handed over by the caller.
    Supplied {
        connection: Arc<dyn ForeignConnection>,
        ownership: Ownership,
    },
}

impl fmt::Debug for ConnectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionSource::Url { url, .. } => f.debug_struct("Url").field("url", url).finish(),
            ConnectionSource::Supplied {
                connection,
                ownership,
            } => f
                .debug_struct("Supplied")
                .field("url", &connection.url())
                .field("ownership", ownership)
                .finish(),
        }
    }
}

impl ConnectionSource {
    fn url(&self) -> &str {
        match self {
            ConnectionSource::Url { url, .. } => url,
            ConnectionSource::Supplied { connection, .. } => connection.url(),
        }
    }
}

/// Reads a foreign table with a single generated `SELECT`.
///
/// The query fetches only the columns named in `init_scan`, in declared
/// order, and carries the rendered restriction as its `WHERE` clause when the
/// renderer produces any text. Getters are forwarded to the foreign result
/// through the scan's [`ProjectionMap`]; columns the query did not fetch
/// read as null.
pub struct ForeignTableAdapter {
    config: ForeignTableConfig,
    schema: ColumnSchema,
    source: ConnectionSource,
    setup: ScanSetup,
    state: CursorState<ForeignCursor>,
    connection_released: bool,
    last_query: Option<String>,
}

impl fmt::Debug for ForeignTableAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignTableAdapter")
            .field("config", &self.config)
            .field("source", &self.source)
            .field("open", &self.state.is_open())
            .field("last_query", &self.last_query)
            .finish_non_exhaustive()
    }
}

impl ForeignTableAdapter {
    pub fn new(config: ForeignTableConfig, source: ConnectionSource) -> Result<Self> {
        let schema = ColumnSchema::new(config.columns.iter().cloned())?;
        Ok(Self {
            config,
            schema,
            source,
            setup: ScanSetup::new(),
            state: CursorState::new(),
            connection_released: false,
            last_query: None,
        })
    }

    /// Adapter whose connection is looked up in `cache` by `url`, opened
    /// through `factory` on a miss.
    pub fn from_url(
        config: ForeignTableConfig,
        url: impl Into<String>,
        cache: Arc<ConnectionCache>,
        factory: Arc<dyn ConnectionFactory>,
    ) -> Result<Self> {
        Self::new(
            config,
            ConnectionSource::Url {
                url: url.into(),
                cache,
                factory,
            },
        )
    }

    pub fn with_connection(
        config: ForeignTableConfig,
        connection: Arc<dyn ForeignConnection>,
        ownership: Ownership,
    ) -> Result<Self> {
        Self::new(
            config,
            ConnectionSource::Supplied {
                connection,
                ownership,
            },
        )
    }

    pub fn config(&self) -> &ForeignTableConfig {
        &self.config
    }

    /// The query sent on the first `next()`, once it has been sent.
    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    /// Query text for the current projection and restriction.
    pub fn make_query(&self) -> String {
        let columns: Vec<String> = self
            .schema
            .names()
            .iter()
            .enumerate()
            .filter(|(idx, _)| self.setup.is_required(idx + 1))
            .map(|(_, name)| quote_identifier(name))
            .collect();
        let select_list = if columns.is_empty() {
            "1".to_string()
        } else {
            columns.join(", ")
        };

        let mut sql = format!(
            "SELECT {select_list} FROM {}",
            self.config.qualified_table()
        );
        if let Some(restriction) = self.setup.restriction() {
            let text = self.config.renderer.render(restriction);
            if !text.trim().is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&text);
            }
        }
        sql
    }

    fn projection(&self) -> ProjectionMap {
        self.setup
            .projection()
            .cloned()
            .unwrap_or_else(|| ProjectionMap::for_schema(&self.schema))
    }

    fn connection(&self) -> Result<Arc<dyn ForeignConnection>> {
        match &self.source {
            ConnectionSource::Url {
                url,
                cache,
                factory,
            } => cache.get_or_connect(url, factory.as_ref()),
            ConnectionSource::Supplied { connection, .. } => {
                if connection.is_closed() {
                    return Err(Error::resource(
                        connection.url(),
                        "supplied connection is already closed",
                    ));
                }
                Ok(Arc::clone(connection))
            }
        }
    }

    fn open(&mut self) -> Result<()> {
        let sql = self.make_query();
        let mapping = self.projection();
        let connection = self.connection()?;
        trace!(url = connection.url(), sql = %sql, "foreign query");
        let cursor = connection.execute_query(&sql).map_err(|err| match err {
            err @ Error::Resource { .. } => err,
            other => Error::resource(format!("query on {}", connection.url()), other),
        })?;
        debug!(
            url = connection.url(),
            fetched = mapping.mapped_count(),
            declared = mapping.len(),
            "foreign cursor opened"
        );
        self.last_query = Some(sql);
        self.state
            .ensure_open(|| Ok(ForwardingCursor::with_mapping(cursor, mapping)))?;
        Ok(())
    }

    fn release_connection(&mut self) -> Result<()> {
        if self.connection_released {
            return Ok(());
        }
        self.connection_released = true;
        match &self.source {
            ConnectionSource::Supplied {
                connection,
                ownership: Ownership::Owned,
            } => {
                debug!(url = connection.url(), "closing owned foreign connection");
                connection.close()
            }
            _ => Ok(()),
        }
    }
}

impl RowCursor for ForeignTableAdapter {
    fn next(&mut self) -> Result<bool> {
        self.setup.mark_fetch_started();
        if self.state.is_unopened() {
            self.open()?;
        }
        let cursor = self.state.resource_mut()?;
        if cursor.next()? {
            return Ok(true);
        }
        if let Some(mut cursor) = self.state.close() {
            cursor.close()?;
        }
        debug!(url = self.source.url(), "foreign cursor exhausted");
        self.release_connection()?;
        Ok(false)
    }

    fn close(&mut self) -> Result<()> {
        let cursor_result = match self.state.close() {
            Some(mut cursor) => {
                debug!(url = self.source.url(), "foreign cursor closed");
                cursor.close()
            }
            None => Ok(()),
        };
        self.setup.release();
        let connection_result = self.release_connection();
        if let (Err(err), Err(_)) = (&cursor_result, &connection_result) {
            warn!(%err, "foreign cursor close failed before the connection close failed");
        }
        cursor_result.and(connection_result)
    }

    fn is_closed(&self) -> bool {
        self.state.is_closed()
            || (self.state.is_unopened() && matches!(self.source, ConnectionSource::Url { .. }))
    }

    fn was_null(&self) -> Result<bool> {
        self.state.resource()?.was_null()
    }

    fn metadata(&self) -> Result<ColumnSchema> {
        Ok(self.schema.clone())
    }

    fn get_value(&mut self, column: usize, kind: ScalarKind) -> Result<ScalarValue> {
        self.schema.check_index(column)?;
        self.state.resource_mut()?.get_value(column, kind)
    }

    fn find_column(&self, name: &str) -> Result<usize> {
        self.schema.find_column(name)
    }
}

// An owned connection is closed even when the adapter is never closed.
impl Drop for ForeignTableAdapter {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(%err, "closing dropped foreign table adapter");
        }
    }
}

impl RestrictedScan for ForeignTableAdapter {
    fn init_scan(
        &mut self,
        required_columns: &[Option<String>],
        restriction: Option<Restriction>,
    ) -> Result<()> {
        self.setup
            .init(&self.schema, required_columns, restriction)
            .map(|_| ())
    }
}

/// The foreign database keeps its statistics to itself, so the planner gets
/// the default estimates.
impl ScanCosting for ForeignTableAdapter {}
