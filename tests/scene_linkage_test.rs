use shadowbox::{
    link::{LinkageRegistry, Technique, shadow_name},
    render::{FramePlan, Pass, Target},
    scene::{SCENE_GEOMETRY, SKYBOX, Scene, link_scene},
};

fn linked_scene() -> (Scene, LinkageRegistry) {
    let mut linkage = LinkageRegistry::new();
    link_scene(&mut linkage, |name| {
        SCENE_GEOMETRY
            .iter()
            .find(|(geometry, _)| *geometry == name)
            .map(|(_, source)| source.layout())
            .ok_or_else(|| anyhow::anyhow!("unknown geometry {name:?}"))
    })
    .unwrap();
    (Scene::load(), linkage)
}

#[test]
fn every_lit_object_has_a_shadow_drawable() {
    let (scene, linkage) = linked_scene();
    for object in scene.objects() {
        let drawable = linkage.resolve(&object.drawable).unwrap();
        assert!(drawable.technique.casts_shadow());
        let shadow = linkage.shadow_of(&drawable.name).unwrap();
        assert_eq!(shadow.name, shadow_name(&drawable.name));
        assert_eq!(shadow.technique, Technique::Shadow);
        assert_eq!(shadow.geometry, drawable.geometry);
    }
    assert!(linkage.shadow_of(SKYBOX).is_none());
}

#[test]
fn plan_draws_opaque_objects_into_the_shadow_map() {
    let (scene, linkage) = linked_scene();
    let plan = FramePlan::build(&scene, &linkage).unwrap();
    let objects = scene.objects().len();
    let opaque = scene
        .objects()
        .iter()
        .filter(|o| linkage.resolve(&o.drawable).unwrap().technique == Technique::Default)
        .count();

    let [(first, shadow), (second, color)] = plan.passes();
    assert_eq!(first, Pass::Shadow);
    assert_eq!(second, Pass::Color);
    assert_eq!(shadow.len(), opaque);
    assert_eq!(opaque, objects - 1);
    assert_eq!(color.len(), objects + 1);
    assert!(shadow.iter().all(|c| c.technique == Technique::Shadow));
    assert!(shadow.iter().all(|c| c.target != Target::Skybox));

    let mut drawn: Vec<usize> = color
        .iter()
        .filter_map(|c| match c.target {
            Target::Object(i) => Some(i),
            Target::Skybox => None,
        })
        .collect();
    drawn.sort_unstable();
    assert_eq!(drawn, (0..objects).collect::<Vec<_>>());
}

#[test]
fn transparent_water_is_drawn_after_opaque_objects() {
    let (scene, linkage) = linked_scene();
    let plan = FramePlan::build(&scene, &linkage).unwrap();
    let first_water = plan
        .color
        .iter()
        .position(|c| c.technique == Technique::Water)
        .unwrap();
    assert!(
        plan.color[..first_water]
            .iter()
            .all(|c| c.technique == Technique::Default)
    );
    assert_eq!(plan.color.last().unwrap().target, Target::Skybox);
}

#[test]
fn crates_share_one_pipeline_per_pass() {
    let (scene, linkage) = linked_scene();
    let plan = FramePlan::build(&scene, &linkage).unwrap();
    let crate_pipelines: Vec<usize> = plan
        .color
        .iter()
        .filter(|c| c.drawable == "cube")
        .map(|c| c.pipeline)
        .collect();
    assert_eq!(crate_pipelines.len(), 900);
    assert!(crate_pipelines.iter().all(|&p| p == crate_pipelines[0]));
    assert_eq!(FramePlan::pipeline_switches(&plan.shadow), 1);
}

#[test]
fn linking_twice_is_rejected() {
    let (_, mut linkage) = linked_scene();
    let err = link_scene(&mut linkage, |_| Ok(SCENE_GEOMETRY[0].1.layout())).unwrap_err();
    assert!(err.to_string().contains("already registered"));
}
