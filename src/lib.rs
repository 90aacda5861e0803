// resource-analyzer compares live cloud resources against IaC declarations
// Copyright (C) 2025  Peoples Grocers LLC
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//
// To purchase a license under different terms contact admin@peoplesgrocers.com
// To request changes, report bugs, or give user feedback contact
// marxism@peoplesgrocers.com
//

pub mod analyze;
pub mod diagnostics;
pub mod diff;
pub mod flags;
pub mod loader;
pub mod logging;
pub mod matching;
pub mod record;
pub mod report;
pub mod upload;

pub use analyze::{analyze_resources, build_report};
pub use diagnostics::{
    Diagnostic, DiagnosticCategory, DiagnosticCode, DiagnosticCollector, DiagnosticLevel,
};
pub use diff::{diff, diff_records, strictly_equal, Difference};
pub use loader::{extract_resources, load_json_file, load_resources};
pub use matching::{resolve_match_key, KeyValue, LookupIndex};
pub use record::{Record, ValueTypeExt};
pub use report::{render_report, OutputFormat, ReportItem, ResourceReport, ResourceState, Summary};
