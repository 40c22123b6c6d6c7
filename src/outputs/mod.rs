//! Output persistence.
//!
//! - [`csv_store`]: CSV files for raw and evaluated articles, plus the
//!   statistics, listing and preview queries over them
//!
//! ```text
//! results/
//! ├── naver_news_코스맥스_화장품_20250506_093000.csv
//! └── naver_news_코스맥스_화장품_20250506_093000_evaluated.csv
//! ```

pub mod csv_store;
