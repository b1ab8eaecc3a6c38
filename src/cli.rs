// Copyright 2026 Savor Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(name = "savor", version, about = "Filter-and-rank restaurant recommender")]
pub struct Cli {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Default)]
pub struct DataArgs {
    /// Restaurant catalog (CSV or JSONL)
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Encoding table aligned with the catalog (CSV or JSONL)
    #[arg(long, global = true)]
    pub encodings: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default config file
    Init,

    /// Recommend restaurants
    Recommend(RecommendArgs),

    /// List cities in the catalog
    Cities {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// List areas of a city
    Areas(AreasArgs),

    /// List cuisines of a city or area
    Cuisines(CuisinesArgs),

    /// Show dataset stats
    Stats {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Check catalog and encoding alignment
    Doctor {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a shell completion script
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[derive(Args, Debug)]
pub struct RecommendArgs {
    /// City to search in
    #[arg(long)]
    pub city: String,

    /// Area within the city ("All Areas" for no restriction)
    #[arg(long)]
    pub area: Option<String>,

    /// Cuisine to include, exactly as listed by `savor cuisines` (repeatable)
    #[arg(long = "cuisine")]
    pub cuisines: Vec<String>,

    /// Minimum rating, inclusive
    #[arg(long)]
    pub min_rating: Option<f64>,

    /// Maximum cost for two, inclusive
    #[arg(long)]
    pub max_cost: Option<f64>,

    /// Number of recommendations
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Include scores and filter stage counts
    #[arg(long)]
    pub explain: bool,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct AreasArgs {
    /// City to list areas for
    #[arg(long)]
    pub city: String,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CuisinesArgs {
    /// City to list cuisines for
    #[arg(long)]
    pub city: String,

    /// Narrow to one area
    #[arg(long)]
    pub area: Option<String>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}
