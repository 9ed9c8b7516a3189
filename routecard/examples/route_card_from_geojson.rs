// Example: Route card for a cutblock against in-memory reference layers
// This example loads a park layer and a block from GeoJSON and prints the card
use anyhow::Result;
use routecard::collect::catalogue::CatalogueTable;
use routecard::collect::controls::ScriptControls;
use routecard::collect::provider::{GeometryProvider, LayerStore, MemoryLayer};
use routecard::geo_core::WORKING_EPSG;
use routecard::geometric::subject::SubjectKind;
use routecard::route_card::{ReportStatus, RouteCard, RunParameters};

fn main() -> Result<()> {
    println!("=== Example: Route card from GeoJSON ===\n");

    // Reference layer in BC Albers
    let parks_data = r#"
    {
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "PROTECTED_LANDS_NAME": "Okanagan Mountain Park" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [1460000.0, 560000.0],
                        [1461000.0, 560000.0],
                        [1461000.0, 561000.0],
                        [1460000.0, 561000.0],
                        [1460000.0, 560000.0]
                    ]]
                }
            }
        ]
    }
    "#;

    // Two blocks: one inside the park, one 30 m east of it
    let blocks_data = r#"
    {
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "CUTB_SEQ_NBR": 1, "LICENCE_ID": "A87212" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [1460100.0, 560100.0],
                        [1460200.0, 560100.0],
                        [1460200.0, 560200.0],
                        [1460100.0, 560200.0],
                        [1460100.0, 560100.0]
                    ]]
                }
            },
            {
                "type": "Feature",
                "properties": { "CUTB_SEQ_NBR": 2, "LICENCE_ID": "A87212" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [1461030.0, 560100.0],
                        [1461130.0, 560100.0],
                        [1461130.0, 560200.0],
                        [1461030.0, 560200.0],
                        [1461030.0, 560100.0]
                    ]]
                }
            }
        ]
    }
    "#;

    let controls = ScriptControls::from_csv_str(
        "Script_Variable,Variable_Value\n\
         SearchBufferDistance,100\n\
         ExtentDistance,500\n\
         InputBlockField,CUTB_SEQ_NBR\n\
         InputBlockTitleFields,LICENCE_ID\n",
    )?;
    let catalogue = CatalogueTable::from_csv_str(
        "Item,Processing,Layer_List,Query_Values,Query_Field,CannedStatement,BufferDistance,Sensitive_Info,Definition_Query,Okanagan\n\
         Land Status,title,,,,,,,,1\n\
         Parks,special_processing,Parks:Name=PROTECTED_LANDS_NAME,,,Overlaps a park.//Near a park.,50,,,1\n\
         Visual Quality,nonspatial,,,,Review the visual quality objectives.,,,,1\n",
    )?;

    let mut store = LayerStore::new();
    store.insert(MemoryLayer::from_geojson_str("Parks", parks_data, WORKING_EPSG)?);
    let blocks = MemoryLayer::from_geojson_str("blocks", blocks_data, WORKING_EPSG)?;
    println!("Loaded {} block(s), {} reference layer(s)", blocks.len(), store.layer_names().len());

    let mut params = RunParameters::new(SubjectKind::Block);
    params.location = Some("Okanagan".to_string());
    params.status = ReportStatus::Preliminary;
    params.owner = "Planning Forester".to_string();

    let card = RouteCard::new(controls, catalogue, params);
    let outcomes = card.run(&store, &blocks.rows(&[], None)?, &[])?;

    for outcome in &outcomes {
        println!("\n--- {} ---", outcome.subject);
        match &outcome.outcome {
            Ok(completed) => {
                let report = &completed.report;
                println!("{}", report.heading);
                println!("Legal location: {}", report.legal_location);
                println!("Date: {}", report.date_text());
                for row in &report.main {
                    println!(
                        "  {:<20} | {:<22} | {:<5} | {}",
                        row.label,
                        row.applicable,
                        row.additional_assessment,
                        row.comments.join("; ")
                    );
                }

                #[cfg(feature = "polars")]
                {
                    let df = report.to_polars_df()?;
                    println!("\nReport DataFrame:\n{}", df);
                }
            }
            Err(e) => println!("Failed: {}", e),
        }
    }

    println!("\n=== Example completed ===");
    Ok(())
}
