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

use resource_analyzer::flags::ResourceAnalyzer;
use resource_analyzer::matching::{count_unmatchable, count_without_key};
use resource_analyzer::upload::{self, Credentials, UploadTarget, DEFAULT_ENDPOINT_URL};
use resource_analyzer::{
    build_report, load_resources, render_report, resolve_match_key, Diagnostic, DiagnosticCode,
    DiagnosticCollector, OutputFormat, Record,
};
use std::fs;
use std::path::Path;
use tracing::info;

struct RunOptions {
    format: OutputFormat,
    upload: Option<UploadTarget>,
}

pub fn run(flags: &ResourceAnalyzer) -> DiagnosticCollector {
    let mut collector = DiagnosticCollector::new();
    let outcome = parse_options(flags).and_then(|options| execute(flags, &options, &mut collector));
    if let Err(diagnostic) = outcome {
        collector.add(diagnostic);
    }
    collector
}

fn parse_options(flags: &ResourceAnalyzer) -> Result<RunOptions, Diagnostic> {
    let format = match &flags.format {
        Some(format) => format.parse::<OutputFormat>()?,
        None => OutputFormat::default(),
    };

    let upload = if flags.upload_s3 {
        let (Some(bucket), Some(key)) = (&flags.bucket, &flags.key) else {
            return Err(Diagnostic::fatal(
                DiagnosticCode::InvalidFlags,
                "--upload-s3 requires both --bucket and --key.".to_string(),
            )
            .with_advice(
                "Example: --upload-s3 --bucket reports --key resource-report.json".to_string(),
            ));
        };
        let endpoint = flags.endpoint_url.as_deref().unwrap_or(DEFAULT_ENDPOINT_URL);
        let region = upload::resolve_region(flags.region.as_deref());
        Some(UploadTarget::new(endpoint, bucket, key, &region)?)
    } else {
        None
    };

    Ok(RunOptions { format, upload })
}

fn execute(
    flags: &ResourceAnalyzer,
    options: &RunOptions,
    collector: &mut DiagnosticCollector,
) -> Result<(), Diagnostic> {
    let cloud_resources = load_resources(&flags.cloud, "cloud", collector)?;
    let iac_resources = load_resources(&flags.iac, "iac", collector)?;

    let match_key = resolve_match_key(&cloud_resources, &iac_resources, flags.match_key.as_deref())?;
    info!(
        match_key = %match_key,
        auto_detected = flags.match_key.as_deref().map_or(true, str::is_empty),
        cloud = cloud_resources.len(),
        iac = iac_resources.len(),
        "resolved match key"
    );
    warn_about_unkeyed(&cloud_resources, &iac_resources, &match_key, collector);

    let report = build_report(&cloud_resources, &iac_resources, &match_key)?;
    let summary = report.summary();
    info!(%summary, "comparison finished");

    let report_json = render_report(&report, options.format, flags.pretty)?;

    match &flags.out {
        Some(out_path) => {
            write_report(out_path, &report_json)?;
            println!("Wrote {}: {}", out_path.display(), summary);
        }
        None => println!("{}", report_json),
    }

    if let Some(target) = &options.upload {
        upload::upload_report(&report_json, target, &Credentials::from_env())?;
        if flags.out.is_some() {
            println!("Uploaded report to {}", target.display_location());
        }
    }

    Ok(())
}

fn warn_about_unkeyed(
    cloud_resources: &[Record],
    iac_resources: &[Record],
    match_key: &str,
    collector: &mut DiagnosticCollector,
) {
    let unkeyed_cloud = count_unmatchable(cloud_resources, match_key);
    if unkeyed_cloud > 0 {
        collector.add(Diagnostic::warning(
            DiagnosticCode::UnkeyedLiveResources,
            format!(
                "{} of {} cloud resources have no usable '{}' value (missing, or an object \
                 or array). They are reported as Missing.",
                unkeyed_cloud,
                cloud_resources.len(),
                match_key
            ),
        ));
    }

    let unkeyed_iac = count_without_key(iac_resources, match_key);
    if unkeyed_iac > 0 {
        collector.add(Diagnostic::warning(
            DiagnosticCode::UnkeyedDeclaredResources,
            format!(
                "{} of {} IaC resources have no '{}' field and can never be matched.",
                unkeyed_iac,
                iac_resources.len(),
                match_key
            ),
        ));
    }
}

fn write_report(out_path: &Path, report_json: &str) -> Result<(), Diagnostic> {
    let write_failed = |e: std::io::Error| {
        Diagnostic::fatal(
            DiagnosticCode::OutputWriteFailed,
            format!("I couldn't write the report to {}: {}", out_path.display(), e),
        )
        .with_advice(
            "Make sure you have write permission in this directory and that the path is valid."
                .to_string(),
        )
    };

    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_failed)?;
    }
    fs::write(out_path, format!("{}\n", report_json)).map_err(write_failed)
}
