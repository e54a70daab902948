use futures::{StreamExt, TryStreamExt};
use tracing::{debug, info, instrument};

use crate::{
    as_the_crow_flies::as_the_crow_flies_matrices,
    cache::{FileCache, MatricesCache},
    osrm::{OsrmMatrixClient, OsrmMatrixClientParams},
    travel_matrices::TravelMatrices,
    travel_matrix_provider::TravelMatrixProvider,
};

/// A rectangular region of the full matrix fetched in one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixBlock {
    pub row_offset: usize,
    pub rows: usize,
    pub col_offset: usize,
    pub cols: usize,
}

/// Splits a `num_sources x num_targets` table into blocks of at most
/// `max_table_size` sources and `max_table_size` targets.
pub fn plan_blocks(num_sources: usize, num_targets: usize, max_table_size: usize) -> Vec<MatrixBlock> {
    let size = max_table_size.max(1);
    let mut blocks = Vec::new();

    for row_offset in (0..num_sources).step_by(size) {
        for col_offset in (0..num_targets).step_by(size) {
            blocks.push(MatrixBlock {
                row_offset,
                rows: size.min(num_sources - row_offset),
                col_offset,
                cols: size.min(num_targets - col_offset),
            });
        }
    }

    blocks
}

pub struct TravelMatrixClient<C> {
    cache: C,
    concurrency: usize,
}

impl Default for TravelMatrixClient<FileCache> {
    fn default() -> Self {
        Self::new(FileCache::default())
    }
}

impl<C> TravelMatrixClient<C>
where
    C: MatricesCache,
{
    pub fn new(cache: C) -> Self {
        Self {
            cache,
            concurrency: 4,
        }
    }

    /// Maximum number of table requests in flight.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[instrument(skip_all, level = "debug")]
    pub async fn fetch_matrix<P>(
        &self,
        sources: &[P],
        targets: &[P],
        provider: TravelMatrixProvider,
    ) -> anyhow::Result<TravelMatrices>
    where
        for<'a> &'a P: Into<geo::Point>,
    {
        if let Some(matrices) = self.cache.get_cached(&provider, sources, targets)? {
            debug!("Using cached matrices");
            return Ok(matrices);
        }

        let matrices = match &provider {
            TravelMatrixProvider::Osrm {
                hosts,
                profile,
                max_table_size,
            } => {
                self.fetch_osrm(sources, targets, hosts, profile, *max_table_size)
                    .await?
            }
            TravelMatrixProvider::AsTheCrowFlies { speed_kmh } => {
                as_the_crow_flies_matrices(sources, targets, *speed_kmh)
            }
            TravelMatrixProvider::Custom { matrices } => {
                if matrices.num_sources != sources.len() || matrices.num_targets != targets.len() {
                    return Err(anyhow::anyhow!(
                        "Custom matrices are {}x{}, expected {}x{}",
                        matrices.num_sources,
                        matrices.num_targets,
                        sources.len(),
                        targets.len()
                    ));
                }
                matrices.clone()
            }
        };

        self.cache.cache(&provider, sources, targets, &matrices)?;

        Ok(matrices)
    }

    /// Each block is bound to one host, round-robin; blocks land in disjoint regions
    /// so completion order does not matter.
    async fn fetch_osrm<P>(
        &self,
        sources: &[P],
        targets: &[P],
        hosts: &[String],
        profile: &str,
        max_table_size: usize,
    ) -> anyhow::Result<TravelMatrices>
    where
        for<'a> &'a P: Into<geo::Point>,
    {
        if hosts.is_empty() {
            return Err(anyhow::anyhow!("No OSRM host configured"));
        }

        let sources = sources.iter().map(Into::into).collect::<Vec<geo::Point>>();
        let targets = targets.iter().map(Into::into).collect::<Vec<geo::Point>>();

        let clients = hosts
            .iter()
            .map(|host| {
                OsrmMatrixClient::new(OsrmMatrixClientParams::new(
                    host.clone(),
                    profile.to_owned(),
                ))
            })
            .collect::<Vec<_>>();

        let blocks = plan_blocks(sources.len(), targets.len(), max_table_size);
        info!(
            "Fetching {}x{} matrix in {} blocks from {} hosts",
            sources.len(),
            targets.len(),
            blocks.len(),
            clients.len()
        );

        let sources = &sources;
        let targets = &targets;
        let results = futures::stream::iter(blocks.into_iter().enumerate().map(|(i, block)| {
            let client = &clients[i % clients.len()];
            async move {
                let table = client
                    .fetch_table(
                        &sources[block.row_offset..block.row_offset + block.rows],
                        &targets[block.col_offset..block.col_offset + block.cols],
                    )
                    .await?;
                debug!(
                    "Block ({}, {}) fetched from {}",
                    block.row_offset,
                    block.col_offset,
                    client.url()
                );
                Ok::<_, anyhow::Error>((block, table))
            }
        }))
        .buffer_unordered(self.concurrency)
        .try_collect::<Vec<_>>()
        .await?;

        let mut matrices = TravelMatrices::new(sources.len(), targets.len());
        for (block, table) in results {
            matrices.assign_block(block.row_offset, block.col_offset, &table);
        }

        Ok(matrices)
    }
}
