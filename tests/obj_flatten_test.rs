use std::io::{BufReader, Cursor};

use shadowbox::data_structures::geometry::{IN_NORMAL, IN_POSITION, IN_TEXCOORD, from_obj_models};

const QUAD: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

fn parse(obj: &str) -> Vec<tobj::Model> {
    let (models, _) = tobj::load_obj_buf(
        &mut BufReader::new(Cursor::new(obj)),
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_| Err(tobj::LoadError::OpenFileFailed),
    )
    .unwrap();
    models
}

#[test]
fn quad_becomes_two_textured_triangles() {
    let data = from_obj_models(&parse(QUAD), "quad.obj").unwrap();
    assert_eq!(data.vertex_count(), 6);
    assert!(data.layout.has(IN_POSITION));
    assert!(data.layout.has(IN_NORMAL));
    assert!(data.layout.has(IN_TEXCOORD));
    assert_eq!(data.attribute(2, IN_POSITION), Some(&[1.0, 1.0, 0.0][..]));
    assert_eq!(data.attribute(2, IN_TEXCOORD), Some(&[1.0, 1.0][..]));
    assert_eq!(data.attribute(5, IN_NORMAL), Some(&[0.0, 0.0, 1.0][..]));
}

#[test]
fn missing_normals_and_uvs_are_zero_filled() {
    let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
    let data = from_obj_models(&parse(obj), "bare.obj").unwrap();
    assert_eq!(data.vertex_count(), 3);
    assert_eq!(data.attribute(1, IN_TEXCOORD), Some(&[0.0, 0.0][..]));
    assert_eq!(data.attribute(1, IN_NORMAL), Some(&[0.0, 0.0, 0.0][..]));
}

#[test]
fn obj_without_faces_is_an_error() {
    let err = from_obj_models(&[], "empty.obj").unwrap_err();
    assert!(err.to_string().contains("empty.obj"));
}
