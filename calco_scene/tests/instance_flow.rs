//! End-to-end flows: author a template, stamp instances, edit, save, reload.

use calco_scene::{
    Component, ComponentType, Light, NodeID, SceneGraph, SceneNode, TemplateLibrary,
    TemplateProvider, Uid, Value, Vector3, load_node_from_str, notify_template_changed, path,
    refresh_from_template, registry, save_node_to_string,
};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn unique(tag: &str) -> String {
    format!("{tag}-{}", Uid::new())
}

/// A lamp: root with a light-bearing "Bulb" child and a bare "Base" child.
fn author_lamp(library: &mut TemplateLibrary, uuid: &str) {
    let mut workbench = SceneGraph::new();
    let root = workbench.insert(SceneNode::new("Lamp"));
    let bulb = workbench.insert(SceneNode::new("Bulb"));
    let base = workbench.insert(SceneNode::new("Base"));
    workbench.add_child(root, bulb);
    workbench.add_child(root, base);
    workbench.add_component(bulb, Component::Light(Light::default()));
    assert!(library.capture(uuid, "Lamp", &workbench, root));
}

#[test]
fn edit_save_reload_keeps_instance_deltas() {
    init_logs();
    let uuid = unique("flow-roundtrip");
    let mut library = TemplateLibrary::new();
    author_lamp(&mut library, &uuid);

    let mut scene = SceneGraph::new();
    let lamp = library
        .instantiate(&mut scene, &uuid, Some(Vector3::new(2.0, 0.0, 1.0)), Some("Hall Lamp"))
        .unwrap();

    // Recorded property edit plus a recorded structural edit.
    let intensity = "children/Bulb/components/Light/intensity";
    assert!(path::set(&mut scene, lamp, intensity, &Value::from(3.5)));
    scene
        .get_mut(lamp)
        .unwrap()
        .ledger_mut()
        .unwrap()
        .set_override(intensity, Value::from(3.5));

    let shade = scene.insert(SceneNode::new("Shade"));
    let shade_uid = scene.get(shade).unwrap().uid;
    scene.add_child(lamp, shade);
    scene
        .get_mut(lamp)
        .unwrap()
        .ledger_mut()
        .unwrap()
        .mark_child_added(shade_uid);

    let json = save_node_to_string(&scene, lamp).unwrap();

    let mut reloaded = SceneGraph::new();
    let lamp2 = load_node_from_str(&mut reloaded, &json, &library).unwrap();

    assert!(path::diff(&scene, lamp, &reloaded, lamp2).is_empty());
    assert_eq!(reloaded.get(lamp2).unwrap().name, "Hall Lamp");
    assert_eq!(path::get(&reloaded, lamp2, intensity).unwrap(), Value::from(3.5));
    assert!(reloaded.child_by_name(lamp2, "Shade").is_some());
    assert!(reloaded.child_by_name(lamp2, "Base").is_some());
}

#[test]
fn template_edit_propagates_but_overrides_win() {
    init_logs();
    let uuid = unique("flow-propagate");
    let mut library = TemplateLibrary::new();
    author_lamp(&mut library, &uuid);

    let mut scene = SceneGraph::new();
    let plain = library.instantiate(&mut scene, &uuid, None, None).unwrap();
    let tuned = library.instantiate(&mut scene, &uuid, None, None).unwrap();

    let intensity = "children/Bulb/components/Light/intensity";
    assert!(path::set(&mut scene, tuned, intensity, &Value::from(8.0)));
    scene
        .get_mut(tuned)
        .unwrap()
        .ledger_mut()
        .unwrap()
        .set_override(intensity, Value::from(8.0));

    // Re-author the template with a different default intensity.
    let mut workbench = SceneGraph::new();
    let root = workbench.insert(SceneNode::new("Lamp"));
    let bulb = workbench.insert(SceneNode::new("Bulb"));
    let base = workbench.insert(SceneNode::new("Base"));
    // Correlation is by uid, so the re-authored nodes reuse the stamped ones.
    {
        let template = library.get_by_uuid(&uuid).unwrap();
        let old_root = template.root();
        let old_bulb = template.graph().child_by_name(old_root, "Bulb").unwrap();
        let old_base = template.graph().child_by_name(old_root, "Base").unwrap();
        let bulb_uid = template.graph().get(old_bulb).unwrap().uid;
        let base_uid = template.graph().get(old_base).unwrap().uid;
        workbench.get_mut(bulb).unwrap().uid = bulb_uid;
        workbench.get_mut(base).unwrap().uid = base_uid;
    }
    workbench.add_child(root, bulb);
    workbench.add_child(root, base);
    workbench.add_component(
        bulb,
        Component::Light(Light {
            intensity: 2.0,
            ..Light::default()
        }),
    );
    assert!(library.capture(uuid.as_str(), "Lamp", &workbench, root));

    assert_eq!(notify_template_changed(&mut scene, &library, &uuid), 2);

    // The plain instance follows the template; the tuned one keeps its value.
    assert_eq!(path::get(&scene, plain, intensity).unwrap(), Value::from(2.0));
    assert_eq!(path::get(&scene, tuned, intensity).unwrap(), Value::from(8.0));
}

#[test]
fn name_and_index_addressing_agree_across_reload() {
    init_logs();
    let uuid = unique("flow-grammar");
    let mut library = TemplateLibrary::new();
    author_lamp(&mut library, &uuid);

    let mut scene = SceneGraph::new();
    let lamp = library.instantiate(&mut scene, &uuid, None, None).unwrap();
    let json = save_node_to_string(&scene, lamp).unwrap();

    let mut reloaded = SceneGraph::new();
    let lamp2 = load_node_from_str(&mut reloaded, &json, &library).unwrap();

    let by_name = path::get(&reloaded, lamp2, "children/Bulb/components/Light/range").unwrap();
    let by_index = path::get(&reloaded, lamp2, "children/0/components/0/range").unwrap();
    assert_eq!(by_name, by_index);
}

#[test]
fn registry_is_weak_across_destruction_and_reload() {
    init_logs();
    let uuid = unique("flow-registry");
    let mut library = TemplateLibrary::new();
    author_lamp(&mut library, &uuid);

    let mut scene = SceneGraph::new();
    let ids: Vec<NodeID> = (0..3)
        .map(|_| library.instantiate(&mut scene, &uuid, None, None).unwrap())
        .collect();
    assert_eq!(registry::instance_count(&scene, &uuid), 3);

    scene.remove_subtree(ids[1]);
    assert_eq!(registry::instance_count(&scene, &uuid), 2);
    assert!(!registry::get_instances(&scene, &uuid).contains(&ids[1]));

    // A reload registers the restored instance under the same template id.
    let json = save_node_to_string(&scene, ids[0]).unwrap();
    let mut other = SceneGraph::new();
    let restored = load_node_from_str(&mut other, &json, &library).unwrap();
    assert!(registry::get_instances(&other, &uuid).contains(&restored));
}

#[test]
fn missing_template_reload_degrades_then_recovers() {
    init_logs();
    let uuid = unique("flow-missing");
    let mut library = TemplateLibrary::new();
    author_lamp(&mut library, &uuid);

    let mut scene = SceneGraph::new();
    let lamp = library.instantiate(&mut scene, &uuid, None, Some("Cellar Lamp")).unwrap();
    let json = save_node_to_string(&scene, lamp).unwrap();

    // First reload without the template: a placeholder that keeps the record.
    let empty = TemplateLibrary::new();
    let mut degraded = SceneGraph::new();
    let placeholder = load_node_from_str(&mut degraded, &json, &empty).unwrap();
    assert_eq!(degraded.get(placeholder).unwrap().name, "Cellar Lamp");
    assert!(degraded.children(placeholder).is_empty());
    let resaved = save_node_to_string(&degraded, placeholder).unwrap();

    // Second reload with the template back: full structure returns.
    let mut recovered = SceneGraph::new();
    let lamp2 = load_node_from_str(&mut recovered, &resaved, &library).unwrap();
    assert!(recovered.child_by_name(lamp2, "Bulb").is_some());
    assert!(
        recovered
            .get(recovered.child_by_name(lamp2, "Bulb").unwrap())
            .unwrap()
            .has_component(ComponentType::Light)
    );
}

#[test]
fn refresh_is_idempotent() {
    init_logs();
    let uuid = unique("flow-idempotent");
    let mut library = TemplateLibrary::new();
    author_lamp(&mut library, &uuid);

    let mut scene = SceneGraph::new();
    let lamp = library.instantiate(&mut scene, &uuid, None, None).unwrap();
    let intensity = "children/Bulb/components/Light/intensity";
    assert!(path::set(&mut scene, lamp, intensity, &Value::from(5.0)));
    scene
        .get_mut(lamp)
        .unwrap()
        .ledger_mut()
        .unwrap()
        .set_override(intensity, Value::from(5.0));

    assert!(refresh_from_template(&mut scene, lamp, &library));
    let snapshot = save_node_to_string(&scene, lamp).unwrap();
    assert!(refresh_from_template(&mut scene, lamp, &library));
    assert_eq!(save_node_to_string(&scene, lamp).unwrap(), snapshot);
}
