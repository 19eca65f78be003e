//! Writes the TypeScript declarations shared with the front end.
//!
//! Usage: `cargo run --bin generate_types [-- <output path>]`

use std::{env, fs, path::PathBuf};

use anyhow::Context;
use db::models::{
    client::{Client, ClientOption, CreateClient, UpdateClient},
    sale::{CreateSale, Sale, SaleWithClient},
};
use server::routes::sales::BulkDeleteResponse;
use services::services::{
    clients::{RateForm, RateStats},
    sales::{BulkDeleteSales, MethodTotal, SaleForm, SalesStats},
    sales_import::{ImportPreview, ImportSummary, NewClientStats},
};
use ts_rs::TS;
use utils::response::ApiResponse;

fn main() -> anyhow::Result<()> {
    let output = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("shared/types.ts"));

    let decls = [
        Client::decl(),
        ClientOption::decl(),
        CreateClient::decl(),
        UpdateClient::decl(),
        Sale::decl(),
        SaleWithClient::decl(),
        CreateSale::decl(),
        RateForm::decl(),
        RateStats::decl(),
        SaleForm::decl(),
        BulkDeleteSales::decl(),
        BulkDeleteResponse::decl(),
        MethodTotal::decl(),
        SalesStats::decl(),
        ImportPreview::decl(),
        NewClientStats::decl(),
        ImportSummary::decl(),
        ApiResponse::<(), ()>::decl(),
    ];

    let mut contents = String::from("// This file was generated by `generate_types`. Do not edit.\n\n");
    for decl in decls {
        contents.push_str("export ");
        contents.push_str(&decl);
        contents.push_str("\n\n");
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&output, contents)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("Wrote {}", output.display());
    Ok(())
}
