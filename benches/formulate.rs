use criterion::criterion_main;
use geo::{coord, LineString, Point};
use rankroute::build::{build_base_network, PoiFeature, RawFeatures, RoadFeature};
use rankroute::config::{BuildConfig, DepotConfig};
use rankroute::geometry::Planar;
use rankroute::{DepotManager, Formulator};

struct GridScenario {
    name: &'static str,
    size: usize,
    vehicles: usize,
    capacity: u32,
}

const GRID_CASES: [GridScenario; 3] = [
    GridScenario {
        name: "GRID_5",
        size: 5,
        vehicles: 3,
        capacity: 4,
    },
    GridScenario {
        name: "GRID_8",
        size: 8,
        vehicles: 4,
        capacity: 6,
    },
    GridScenario {
        name: "GRID_12",
        size: 12,
        vehicles: 6,
        capacity: 8,
    },
];

const SPACING: f64 = 100.0;

/// A `size` x `size` street grid with a taxi rank halfway along every third
/// horizontal block. Streets carry a vertex at every crossing.
fn grid(size: usize) -> RawFeatures {
    let mut roads = Vec::with_capacity(size * 2);

    for step in 0..size {
        let offset = step as f64 * SPACING;
        let crossings = (0..size).map(|other| other as f64 * SPACING);

        roads.push(RoadFeature::new(
            crossings.clone().map(|x| coord! { x: x, y: offset }).collect::<LineString>(),
            Default::default(),
        ));
        roads.push(RoadFeature::new(
            crossings.map(|y| coord! { x: offset, y: y }).collect::<LineString>(),
            Default::default(),
        ));
    }

    let pois = (0..size)
        .flat_map(|row| (0..size - 1).map(move |column| (row, column)))
        .filter(|(row, column)| (row + column) % 3 == 0)
        .map(|(row, column)| {
            let x = (column as f64 + 0.5) * SPACING;
            let y = row as f64 * SPACING + 0.4;
            PoiFeature::new(Point::new(x, y), Default::default())
        })
        .collect();

    RawFeatures::new(roads, pois)
}

fn formulate_benchmark(c: &mut criterion::Criterion) {
    let mut group = c.benchmark_group("formulate");
    group.significance_level(0.1).sample_size(20);

    GRID_CASES.into_iter().for_each(|sc| {
        let (network, _) = build_base_network(grid(sc.size), &Planar, &BuildConfig::default())
            .expect("Grid must build");
        let manager = DepotManager::new(network, Planar, DepotConfig::default());
        let formulator = Formulator::default();

        group.bench_function(format!("route: {}", sc.name), |b| {
            b.iter(|| {
                let (graph, depot) = manager
                    .insert_depot(SPACING * 0.5 + 20.0, SPACING * 0.5)
                    .expect("Depot must be placed");

                let routes = formulator
                    .solve_routing(&graph, depot, sc.vehicles, sc.capacity)
                    .expect("Routing must succeed");

                assert_eq!(routes.len(), sc.vehicles);
            })
        });
    });

    group.finish();
}

criterion::criterion_group!(targeted_benches, formulate_benchmark);
criterion_main!(targeted_benches);
