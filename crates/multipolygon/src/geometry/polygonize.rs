//! Builds polygons from a set of noded line segments by walking the faces
//! of the planar graph they form.

use super::coord_key;
use geo::{Area, Contains, Coord, LineString, MultiLineString, Polygon};
use hashbrown::{HashMap, HashSet};

struct Graph {
    coords: Vec<Coord<f64>>,
    /// Neighbours of each node, sorted counter-clockwise by angle
    adjacent: Vec<Vec<usize>>,
}

impl Graph {
    fn build(lines: &MultiLineString<f64>) -> Self {
        let mut index: HashMap<(i64, i64), usize> = HashMap::new();
        let mut coords: Vec<Coord<f64>> = Vec::new();
        let mut edges: HashSet<(usize, usize)> = HashSet::new();

        let mut node = |c: &Coord<f64>, coords: &mut Vec<Coord<f64>>| {
            *index.entry(coord_key(c)).or_insert_with(|| {
                coords.push(*c);
                coords.len() - 1
            })
        };

        for line in &lines.0 {
            for w in line.0.windows(2) {
                let a = node(&w[0], &mut coords);
                let b = node(&w[1], &mut coords);
                if a != b {
                    edges.insert((a.min(b), a.max(b)));
                }
            }
        }

        let mut adjacent = vec![Vec::new(); coords.len()];
        for &(a, b) in &edges {
            adjacent[a].push(b);
            adjacent[b].push(a);
        }

        let mut graph = Graph { coords, adjacent };
        graph.remove_dangles();
        graph.sort_by_angle();
        graph
    }

    fn remove_dangles(&mut self) {
        let mut queue: Vec<usize> = (0..self.adjacent.len())
            .filter(|&n| self.adjacent[n].len() == 1)
            .collect();

        while let Some(n) = queue.pop() {
            let Some(&other) = self.adjacent[n].first() else {
                continue;
            };
            self.adjacent[n].clear();
            self.adjacent[other].retain(|&x| x != n);
            if self.adjacent[other].len() == 1 {
                queue.push(other);
            }
        }
    }

    fn sort_by_angle(&mut self) {
        for n in 0..self.adjacent.len() {
            let origin = self.coords[n];
            let coords = &self.coords;
            self.adjacent[n].sort_by(|&a, &b| {
                let angle = |m: usize| (coords[m].y - origin.y).atan2(coords[m].x - origin.x);
                angle(a).total_cmp(&angle(b))
            });
        }
    }

    /// Every face as a closed ring. Bounded faces come out counter-clockwise,
    /// the outside of each connected component clockwise.
    fn faces(&self) -> Vec<(Vec<usize>, LineString<f64>)> {
        let edge_count: usize = self.adjacent.iter().map(Vec::len).sum();
        let mut visited: HashSet<(usize, usize)> = HashSet::new();
        let mut faces = Vec::new();

        for start in 0..self.adjacent.len() {
            for &first in &self.adjacent[start] {
                if visited.contains(&(start, first)) {
                    continue;
                }
                let mut nodes = vec![start];
                let (mut from, mut to) = (start, first);
                for _ in 0..edge_count {
                    visited.insert((from, to));
                    let around = &self.adjacent[to];
                    let Some(pos) = around.iter().position(|&x| x == from) else {
                        break;
                    };
                    let next = around[(pos + around.len() - 1) % around.len()];
                    from = to;
                    to = next;
                    if (from, to) == (start, first) {
                        break;
                    }
                    nodes.push(from);
                }
                let mut ring: Vec<Coord<f64>> = nodes.iter().map(|&n| self.coords[n]).collect();
                ring.push(self.coords[start]);
                faces.push((nodes, LineString::new(ring)));
            }
        }
        faces
    }
}

pub(crate) fn polygonize(lines: &MultiLineString<f64>) -> Vec<Polygon<f64>> {
    let graph = Graph::build(lines);

    let mut shells: Vec<(HashSet<usize>, Polygon<f64>)> = Vec::new();
    let mut holes: Vec<(HashSet<usize>, LineString<f64>)> = Vec::new();
    for (nodes, ring) in graph.faces() {
        if ring.0.len() < 4 {
            continue;
        }
        let polygon = Polygon::new(ring, vec![]);
        let area = polygon.signed_area();
        let nodes: HashSet<usize> = nodes.into_iter().collect();
        if area > 0.0 {
            shells.push((nodes, polygon));
        } else if area < 0.0 {
            holes.push((nodes, polygon.exterior().clone()));
        }
    }

    let mut interiors: Vec<Vec<LineString<f64>>> = vec![Vec::new(); shells.len()];
    for (hole_nodes, hole) in holes {
        let sample = hole.0[0];
        let owner = shells
            .iter()
            .enumerate()
            .filter(|(_, (nodes, shell))| nodes.is_disjoint(&hole_nodes) && shell.contains(&sample))
            .min_by(|(_, (_, a)), (_, (_, b))| a.unsigned_area().total_cmp(&b.unsigned_area()))
            .map(|(i, _)| i);
        if let Some(i) = owner {
            interiors[i].push(hole);
        }
    }

    shells
        .into_iter()
        .zip(interiors)
        .map(|((_, shell), holes)| {
            let (exterior, _) = shell.into_inner();
            Polygon::new(exterior, holes)
        })
        .collect()
}
