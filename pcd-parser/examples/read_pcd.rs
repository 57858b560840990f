use std::env;

use pcd_parser::parse_file;

fn main() {
    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| "examples/data/sample.pcd".to_string());

    let point_cloud = parse_file(&path);

    println!(
        "Number of points: {num_points}",
        num_points = point_cloud.as_ref().unwrap().header.points
    );

    match &point_cloud.as_ref().unwrap().positions {
        Some(positions) => println!("First point: {:?}", positions.get(0)),
        None => println!("No x/y/z fields"),
    }
}
