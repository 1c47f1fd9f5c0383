//! The `regions` subcommand: shows the region table.

use anyhow::Result;
use carfinder_lib::{validation, Region, RegionTable};
use clap::Args;

use crate::output::{print_regions, OutputFormat};

#[derive(Args)]
pub struct RegionsArgs {
    /// Resolve these region names instead of listing the known ones
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    pub resolve: Vec<String>,
}

pub fn run(args: &RegionsArgs, format: &OutputFormat) -> Result<()> {
    let table = RegionTable::new();
    let regions: Vec<Region> = if args.resolve.is_empty() {
        table
            .known()
            .map(|(name, url)| Region::new(name, url.clone()))
            .collect()
    } else {
        args.resolve
            .iter()
            .map(|name| -> Result<Region> {
                let name = validation::validate_region(name)?;
                Ok(table.resolve(&name)?)
            })
            .collect::<Result<_>>()?
    };
    print_regions(&regions, format)
}
