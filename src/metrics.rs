//! Optional observability: Prometheus metrics (`metrics` feature) and
//! `tracing` spans (`tracing` feature).

#[cfg(feature = "metrics")]
pub use self::prometheus_metrics::*;

#[cfg(feature = "metrics")]
mod prometheus_metrics {
    use once_cell::sync::Lazy;
    use opentelemetry::{
        global,
        metrics::{Counter, Histogram},
    };
    use opentelemetry_prometheus::PrometheusExporter;

    pub static METRICS: Lazy<UndertowMetrics> = Lazy::new(UndertowMetrics::init);

    pub struct UndertowMetrics {
        pub exporter: PrometheusExporter,
        pub queries_total: Counter<u64>,
        pub query_errors_total: Counter<u64>,
        pub query_duration: Histogram<f64>,
        pub statements_total: Counter<u64>,
        pub tables_introspected: Counter<u64>,
    }

    impl UndertowMetrics {
        pub fn init() -> Self {
            let exporter = opentelemetry_prometheus::exporter()
                .build()
                .expect("failed to build prometheus exporter");
            let meter = global::meter("undertow");

            let queries_total = meter
                .u64_counter("undertow_queries_total")
                .with_description("Total catalog queries and statements sent to the server")
                .build();

            let query_errors_total = meter
                .u64_counter("undertow_query_errors_total")
                .with_description("Queries or statements rejected by the server")
                .build();

            let query_duration = meter
                .f64_histogram("undertow_query_duration_seconds")
                .with_description("Duration of queries")
                .build();

            let statements_total = meter
                .u64_counter("undertow_ddl_statements_total")
                .with_description("DDL statements emitted by migration runs")
                .build();

            let tables_introspected = meter
                .u64_counter("undertow_tables_introspected_total")
                .with_description("Live tables read from the catalog")
                .build();

            Self {
                exporter,
                queries_total,
                query_errors_total,
                query_duration,
                statements_total,
                tables_introspected,
            }
        }

        pub fn record_query_duration(&self, elapsed: std::time::Duration) {
            self.queries_total.add(1, &[]);
            self.query_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_query_error(&self) {
            self.query_errors_total.add(1, &[]);
        }

        pub fn record_statement(&self) {
            self.statements_total.add(1, &[]);
        }

        pub fn record_table_introspected(&self) {
            self.tables_introspected.add(1, &[]);
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::{info_span, Span};

    pub fn execute_query_span(query: &str) -> Span {
        let summary: String = query.split_whitespace().take(6).collect::<Vec<_>>().join(" ");
        info_span!("undertow.query", db.statement = %summary)
    }

    pub fn acquire_connection_span() -> Span {
        info_span!("undertow.connect")
    }

    pub fn migrate_table_span(table: &str, pass: &'static str) -> Span {
        info_span!("undertow.migrate_table", table = %table, pass = pass)
    }

    pub fn introspect_table_span(table: &str) -> Span {
        info_span!("undertow.introspect_table", table = %table)
    }
}
