/**
 * File: /src/config.rs
 * Created Date: Friday, January 26th 2024
 * Author: Zihan
 * -----
 * Last Modified: Tuesday, 12th March 2024 3:21:08 pm
 * Modified By: the developer formerly known as Zihan at <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2024-03-12		Zihan	positional args for the rating factorization run
 */
use std::path::PathBuf;

use crate::factor::{DenominatorGuard, WnmfConfig};

/// Run configuration for the command line binary
#[derive(Debug, Clone)]
pub struct Config {
    reviews: PathBuf,
    users: PathBuf,
    items: PathBuf,
    out_dir: PathBuf,
    wnmf: WnmfConfig,
}

impl Config {
    /// constructor
    ///
    /// # Examples
    /// ```bash
    /// $ cargo run -- reviews.csv users.json items.json out/ 40 4 42 1e-10
    /// ```
    pub fn new(
        mut args: impl Iterator<Item = String>,
    ) -> Result<Config, Box<dyn std::error::Error>> {
        // args:
        // 0: program name
        // 1: review csv path
        // 2: user id table (json)
        // 3: business id table (json)
        // 4: output directory
        // 5: rank (optional)
        // 6: sweeps (optional)
        // 7: seed (optional)
        // 8: epsilon (optional, 0 disables the guard, "skip" leaves zero-denominator entries)
        args.next();
        let usage = "usage: rating_wnmf <reviews.csv> <users.json> <items.json> <out_dir> [rank] [sweeps] [seed] [epsilon|skip]";
        let reviews = PathBuf::from(args.next().ok_or(usage)?);
        let users = PathBuf::from(args.next().ok_or(usage)?);
        let items = PathBuf::from(args.next().ok_or(usage)?);
        let out_dir = PathBuf::from(args.next().ok_or(usage)?);

        let mut wnmf = WnmfConfig::default();
        if let Some(rank) = args.next() {
            wnmf.rank = rank.parse::<usize>()?;
        }
        if let Some(sweeps) = args.next() {
            wnmf.sweep_count = sweeps.parse::<usize>()?;
        }
        if let Some(seed) = args.next() {
            wnmf.seed = Some(seed.parse::<u64>()?);
        }
        if let Some(guard) = args.next() {
            wnmf.guard = match guard.as_str() {
                "skip" => DenominatorGuard::SkipZero,
                eps => match eps.parse::<f64>()? {
                    eps if eps == 0.0 => DenominatorGuard::Disabled,
                    eps => DenominatorGuard::Epsilon(eps),
                },
            };
        }
        wnmf.validate()?;

        Ok(Config {
            reviews,
            users,
            items,
            out_dir,
            wnmf,
        })
    }

    pub fn get_reviews(&self) -> &PathBuf {
        &self.reviews
    }

    pub fn get_users(&self) -> &PathBuf {
        &self.users
    }

    pub fn get_items(&self) -> &PathBuf {
        &self.items
    }

    pub fn get_out_dir(&self) -> &PathBuf {
        &self.out_dir
    }

    pub fn get_wnmf(&self) -> &WnmfConfig {
        &self.wnmf
    }
}
