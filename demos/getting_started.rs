use geoscan::{GeoPoint, GeoServiceBuilder, GetPointRequest, PutPointRequest, QueryRequest};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG=debug to follow each query through its phases
    env_logger::init();

    println!("=== geoscan - Getting Started ===\n");

    let service = GeoServiceBuilder::new("cities")
        .max_concurrent_scans(8)
        .query_timeout(Duration::from_secs(5))
        .build_in_memory()?;
    println!("Created in-memory geo table '{}'\n", service.config().table_name);

    println!("1. Storing points");
    println!("-----------------");
    let cities = [
        ("nyc", "New York", GeoPoint::new(40.7128, -74.0060)),
        ("jersey-city", "Jersey City", GeoPoint::new(40.7178, -74.0431)),
        ("london", "London", GeoPoint::new(51.5074, -0.1278)),
        ("paris", "Paris", GeoPoint::new(48.8566, 2.3522)),
        ("brussels", "Brussels", GeoPoint::new(50.8503, 4.3517)),
    ];
    for (key, name, point) in cities {
        let stored = service
            .put_point(PutPointRequest::new(point, key).with_attribute("name", name))
            .await?;
        println!("   {:<12} {} -> partition {}, cell {}", key, point, stored.key.hash_key, stored.cell_id);
    }
    println!();

    println!("2. Rectangle query");
    println!("------------------");
    let manhattan = service
        .query_rectangle(GeoPoint::new(40.70, -74.02), GeoPoint::new(40.73, -73.99), None)
        .await?;
    println!(
        "   {} of {} candidates inside lower Manhattan ({} scans)",
        manhattan.len(),
        manhattan.raw_count,
        manhattan.scan_count
    );
    for key in manhattan.range_keys("rangeKey") {
        println!("     - {}", key);
    }
    println!();

    println!("3. Radius query");
    println!("---------------");
    let request = QueryRequest::circle(GeoPoint::new(51.5074, -0.1278), 350_000.0)
        .with_attributes(vec!["name".to_string()]);
    let near_london = service.query(request).await?;
    println!("   Cities within 350km of London:");
    for item in &near_london.items {
        let name = item.item.get("name").and_then(|v| v.as_str()).unwrap_or("?");
        println!("     - {} at {}", name, item.point);
    }
    println!();

    println!("4. Point lookup");
    println!("---------------");
    let paris = service
        .get_point(GetPointRequest::new(GeoPoint::new(48.8566, 2.3522), "paris"))
        .await?;
    println!("   paris found: {}", paris.is_some());
    println!();

    let stats = service.stats();
    println!(
        "Stats: {} puts, {} queries, {} scans, {} pages",
        stats.puts, stats.queries, stats.scans, stats.pages
    );

    Ok(())
}
