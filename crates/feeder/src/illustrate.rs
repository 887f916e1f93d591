use std::path::Path;

use svg::{
    node::element::{path::Data, Circle, Path as SvgPath},
    Document,
};
use vplotter_geom::{MachineGeometry, Point};
use vplotter_motion::{sim::Event, PenConfig};

/// Replays recorded steps to find out where the pen went.
///
/// Returns one polyline for each stretch of time that the pen was down.
/// The recording is assumed to start right after initialization, with the
/// pen at the origin.
pub fn pen_paths(geom: &MachineGeometry, pen: &PenConfig, events: &[Event]) -> Vec<Vec<Point>> {
    let mut cords = geom.cord_lengths(&Point::origin());
    let mut pen_down = false;
    let mut paths = Vec::new();
    let mut current = Vec::new();

    for ev in events {
        match *ev {
            Event::Pulse(p) => {
                *cords.get_mut(p.axis) += if p.forward { 1.0 } else { -1.0 };
                if pen_down {
                    current.push(geom.cord_lengths_to_point(&cords));
                }
            }
            Event::Pwm(duty) if duty == pen.down_duty && !pen_down => {
                pen_down = true;
                current.push(geom.cord_lengths_to_point(&cords));
            }
            Event::Pwm(duty) if duty == pen.up_duty && pen_down => {
                pen_down = false;
                if current.len() > 1 {
                    paths.push(std::mem::take(&mut current));
                }
                current.clear();
            }
            Event::Pwm(_) => {}
        }
    }
    if current.len() > 1 {
        paths.push(current);
    }
    paths
}

pub fn write_svg(out: &Path, geom: &MachineGeometry, paths: &[Vec<Point>]) -> anyhow::Result<()> {
    let offset = geom.origin_offset();
    let anchors = [
        Point::new(-offset.x, -offset.y),
        Point::new(geom.base_length() - offset.x, -offset.y),
    ];

    // SVG's y axis points down.
    let flip = |p: &Point| (p.x as f32, -p.y as f32);

    let mut min = Point::new(f64::INFINITY, f64::INFINITY);
    let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in paths.iter().flatten().chain(&anchors) {
        min = min.min(*p);
        max = max.max(*p);
    }
    let margin = 10.0;
    let (left, top) = (min.x - margin, -max.y - margin);
    let (w, h) = (max.x - min.x + 2.0 * margin, max.y - min.y + 2.0 * margin);

    let mut document =
        Document::new().set("viewBox", (left as f32, top as f32, w as f32, h as f32));

    for anchor in &anchors {
        let (cx, cy) = flip(anchor);
        document = document.add(
            Circle::new()
                .set("cx", cx)
                .set("cy", cy)
                .set("r", 3.0)
                .set("fill", "blue"),
        );
    }

    for path in paths {
        let Some((first, rest)) = path.split_first() else {
            continue;
        };
        let mut data = Data::new().move_to(flip(first));
        for p in rest {
            data = data.line_to(flip(p));
        }
        let line = SvgPath::new()
            .set("fill", "none")
            .set("stroke", "black")
            .set("stroke-width", 0.5)
            .set("d", data);
        document = document.add(line);
    }

    svg::save(out, &document)?;
    Ok(())
}
