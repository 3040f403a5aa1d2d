/*
 * File: /main.rs
 * Created Date: Tuesday November 21st 2023
 * Author: Zihan
 * -----
 * Last Modified: Tuesday, 12th March 2024 3:05:40 pm
 * Modified By: the developer formerly known as Zihan at <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 */

use std::error::Error;

use chrono::Local;
use log::{info, LevelFilter};

use rating_wnmf::config::Config;

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()?;

    let config = Config::new(std::env::args())?;
    let method = "wnmf";
    info!(
        "[method: {}] [{}] rank {}, {} sweeps",
        method,
        timestamp(),
        config.get_wnmf().rank,
        config.get_wnmf().sweep_count
    );

    let output = rating_wnmf::run(&config)?;

    info!(
        "[method: {}] [{}] RMSE: {:.4}, MAE: {:.4}",
        method,
        timestamp(),
        output.summary.rmse,
        output.summary.mae
    );
    Ok(())
}
