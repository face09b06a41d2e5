use std::io::Cursor;

use roll_ngin::{
    data_structures::mesh::{MeshBuffer, Topology, Vertex},
    resources::{
        chunk::write_chunk,
        mesh_file::{IndexEntry, MeshError},
    },
};

mod common;

#[test]
fn meshes_read_back_with_bounds() {
    let mut buffer = MeshBuffer::new();
    buffer.push_mesh("floor", Topology::Triangles, &common::quad(3.0, -1.0));
    buffer.push_mesh("marker", Topology::Triangles, &common::marker());

    let mut data = Vec::new();
    buffer.write_to(&mut data).unwrap();
    let read = MeshBuffer::from_reader(&mut Cursor::new(data), "meshes").unwrap();

    assert_eq!(read.len(), 2);
    assert_eq!(read.vertices, buffer.vertices);
    let floor = read.lookup("floor").unwrap();
    assert_eq!((floor.start, floor.count), (0, 6));
    assert_eq!(floor.topology, Topology::Triangles);
    assert_eq!([floor.min.x, floor.min.y, floor.min.z], [-3.0, -3.0, -1.0]);
    assert_eq!([floor.max.x, floor.max.y, floor.max.z], [3.0, 3.0, -1.0]);
    let marker = read.lookup("marker").unwrap();
    assert_eq!((marker.start, marker.count), (6, 3));
    assert!(read.lookup("missing").is_none());
}

#[test]
fn only_triangle_meshes_are_written() {
    let mut buffer = MeshBuffer::new();
    buffer.push_mesh("wire", Topology::Lines, &common::marker());
    buffer.push_mesh("solid", Topology::Triangles, &common::marker());
    let mut data = Vec::new();
    buffer.write_to(&mut data).unwrap();
    let read = MeshBuffer::from_reader(&mut Cursor::new(data), "meshes").unwrap();
    assert_eq!(read.len(), 1);
    assert_eq!(read.lookup("solid").unwrap().start, 3);
}

fn raw(vertices: &[Vertex], names: &[u8], index: &[IndexEntry]) -> Vec<u8> {
    let mut data = Vec::new();
    write_chunk(&mut data, b"pnct", vertices).unwrap();
    write_chunk(&mut data, b"str0", names).unwrap();
    write_chunk(&mut data, b"idx0", index).unwrap();
    data
}

#[test]
fn vertex_ranges_are_checked() {
    let data = raw(
        &common::marker(),
        b"tri",
        &[IndexEntry {
            name_begin: 0,
            name_end: 3,
            vertex_begin: 0,
            vertex_end: 4,
        }],
    );
    let err = MeshBuffer::from_reader(&mut Cursor::new(data), "bad").unwrap_err();
    match err {
        MeshError::InvalidVertexRange {
            name,
            end,
            vertices,
            ..
        } => {
            assert_eq!(name, "tri");
            assert_eq!(end, 4);
            assert_eq!(vertices, 3);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn name_ranges_are_checked() {
    let data = raw(
        &common::marker(),
        b"tri",
        &[IndexEntry {
            name_begin: 2,
            name_end: 9,
            vertex_begin: 0,
            vertex_end: 3,
        }],
    );
    let err = MeshBuffer::from_reader(&mut Cursor::new(data), "bad").unwrap_err();
    assert!(matches!(
        err,
        MeshError::InvalidNameRange {
            index: 0,
            begin: 2,
            end: 9
        }
    ));
}

#[test]
fn obj_models_become_triangle_meshes() {
    let obj = "\
o ramp
v 0 0 0
v 2 0 0
v 2 2 1
v 0 2 1
vn 0 -0.447 0.894
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";
    let buffer = MeshBuffer::from_obj(&mut Cursor::new(obj.as_bytes()), "ramp.obj").unwrap();
    let ramp = buffer.lookup("ramp").unwrap();
    assert_eq!(ramp.topology, Topology::Triangles);
    // the quad face is triangulated and unindexed
    assert_eq!(ramp.count, 6);
    assert_eq!([ramp.max.x, ramp.max.y, ramp.max.z], [2.0, 2.0, 1.0]);
    for vertex in &buffer.vertices {
        assert_eq!(vertex.normal, [0.0, -0.447, 0.894]);
        assert_eq!(vertex.color, [0xff; 4]);
    }
    // texture v is flipped
    assert!(buffer
        .vertices
        .iter()
        .any(|v| v.position == [0.0, 0.0, 0.0] && v.tex_coord == [0.0, 1.0]));
}
