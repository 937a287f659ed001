//! Report definitions compiled into the binary.

pub(crate) const BUILTIN_QUERIES: &[(&str, &str)] = &[
    ("asynchronous-metrics.yaml", include_str!("../../queries/asynchronous-metrics.yaml")),
    ("backups.yaml", include_str!("../../queries/backups.yaml")),
    ("chart-cpu-usage.yaml", include_str!("../../queries/chart-cpu-usage.yaml")),
    ("chart-disk-usage.yaml", include_str!("../../queries/chart-disk-usage.yaml")),
    ("chart-failed-query-count.yaml", include_str!("../../queries/chart-failed-query-count.yaml")),
    ("chart-memory-usage.yaml", include_str!("../../queries/chart-memory-usage.yaml")),
    ("chart-merge-count.yaml", include_str!("../../queries/chart-merge-count.yaml")),
    ("chart-query-count.yaml", include_str!("../../queries/chart-query-count.yaml")),
    ("chart-query-duration.yaml", include_str!("../../queries/chart-query-duration.yaml")),
    ("chart-query-memory.yaml", include_str!("../../queries/chart-query-memory.yaml")),
    ("chart-replication-queue-count.yaml", include_str!("../../queries/chart-replication-queue-count.yaml")),
    ("chart-top-table-size.yaml", include_str!("../../queries/chart-top-table-size.yaml")),
    ("clusters.yaml", include_str!("../../queries/clusters.yaml")),
    ("detached-parts.yaml", include_str!("../../queries/detached-parts.yaml")),
    ("dictionaries.yaml", include_str!("../../queries/dictionaries.yaml")),
    ("disks.yaml", include_str!("../../queries/disks.yaml")),
    ("distributed-ddl-queue.yaml", include_str!("../../queries/distributed-ddl-queue.yaml")),
    ("errors.yaml", include_str!("../../queries/errors.yaml")),
    ("expensive-queries.yaml", include_str!("../../queries/expensive-queries.yaml")),
    ("explorer-columns.yaml", include_str!("../../queries/explorer-columns.yaml")),
    ("explorer-databases.yaml", include_str!("../../queries/explorer-databases.yaml")),
    ("explorer-ddl.yaml", include_str!("../../queries/explorer-ddl.yaml")),
    ("explorer-indexes.yaml", include_str!("../../queries/explorer-indexes.yaml")),
    ("explorer-projections.yaml", include_str!("../../queries/explorer-projections.yaml")),
    ("explorer-tables.yaml", include_str!("../../queries/explorer-tables.yaml")),
    ("failed-queries.yaml", include_str!("../../queries/failed-queries.yaml")),
    ("history-queries.yaml", include_str!("../../queries/history-queries.yaml")),
    ("merges.yaml", include_str!("../../queries/merges.yaml")),
    ("mergetree-settings.yaml", include_str!("../../queries/mergetree-settings.yaml")),
    ("metrics.yaml", include_str!("../../queries/metrics.yaml")),
    ("mutations.yaml", include_str!("../../queries/mutations.yaml")),
    ("query-detail.yaml", include_str!("../../queries/query-detail.yaml")),
    ("readonly-tables.yaml", include_str!("../../queries/readonly-tables.yaml")),
    ("replicas.yaml", include_str!("../../queries/replicas.yaml")),
    ("replication-queue.yaml", include_str!("../../queries/replication-queue.yaml")),
    ("roles.yaml", include_str!("../../queries/roles.yaml")),
    ("running-queries.yaml", include_str!("../../queries/running-queries.yaml")),
    ("settings.yaml", include_str!("../../queries/settings.yaml")),
    ("tables-overview.yaml", include_str!("../../queries/tables-overview.yaml")),
    ("users.yaml", include_str!("../../queries/users.yaml")),
];
