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

use std::path::PathBuf;

xflags::xflags! {
    /// Compare cloud resources against IaC resources and emit a JSON resource report.
    cmd resource-analyzer {
        /// Path to the cloud (live state) JSON file
        required --cloud cloud: PathBuf

        /// Path to the IaC (declared state) JSON file
        required --iac iac: PathBuf

        /// Resource identifier key to match on (auto-detects id, resourceId, arn, name if omitted)
        optional --match-key match_key: String

        /// Write report JSON to this file path instead of stdout
        optional -o, --out out: PathBuf

        /// Pretty-print JSON output
        optional --pretty

        /// Output format: 'wrapped' (default) includes metadata, 'array' prints only resource entries
        optional --format format: String

        /// Upload the generated report JSON to S3
        optional --upload-s3

        /// S3 bucket name for report upload
        optional --bucket bucket: String

        /// S3 object key for report upload
        optional --key key: String

        /// S3 endpoint URL (default: http://localhost:4566)
        optional --endpoint-url endpoint_url: String

        /// S3 region (default: AWS_REGION, AWS_DEFAULT_REGION, or us-east-1)
        optional --region region: String

        /// Log each stage to stderr
        optional -v, --verbose
    }
}
