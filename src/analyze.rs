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

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

use crate::diagnostics::Diagnostic;
use crate::diff;
use crate::matching::LookupIndex;
use crate::record::Record;
use crate::report::{ReportItem, ResourceReport};

/// Compare every cloud resource against its IaC declaration.
///
/// Returns one item per cloud resource, in input order. Fails only when the
/// IaC side can't be indexed unambiguously. Cloud resources without a usable
/// key are not errors; they come back as `Missing`.
pub fn analyze_resources(
    cloud_resources: &[Record],
    iac_resources: &[Record],
    match_key: &str,
) -> Result<Vec<ReportItem>, Diagnostic> {
    let index = LookupIndex::build(iac_resources, match_key)?;
    if index.is_empty() && !cloud_resources.is_empty() {
        debug!(match_key, "no IaC resource has a usable match key, every cloud resource is Missing");
    }

    #[cfg(feature = "parallel")]
    let items: Vec<ReportItem> = cloud_resources
        .par_iter()
        .map(|cloud_item| compare_one(cloud_item, &index))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let items: Vec<ReportItem> = cloud_resources
        .iter()
        .map(|cloud_item| compare_one(cloud_item, &index))
        .collect();

    debug!(
        compared = items.len(),
        indexed = index.len(),
        "compared cloud resources"
    );
    Ok(items)
}

/// [`analyze_resources`] wrapped into a timestamped report.
pub fn build_report(
    cloud_resources: &[Record],
    iac_resources: &[Record],
    match_key: &str,
) -> Result<ResourceReport, Diagnostic> {
    let items = analyze_resources(cloud_resources, iac_resources, match_key)?;
    Ok(ResourceReport::new(match_key.to_string(), items))
}

fn compare_one(cloud_item: &Record, index: &LookupIndex<'_>) -> ReportItem {
    match index.find(cloud_item) {
        Some(iac_item) => {
            let change_log = diff::diff_records(cloud_item, iac_item);
            ReportItem::compared(cloud_item.clone(), iac_item.clone(), change_log)
        }
        None => ReportItem::missing(cloud_item.clone()),
    }
}
