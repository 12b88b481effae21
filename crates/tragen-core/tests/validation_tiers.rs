//! # Validation Tier Tests (T0-T3)
//!
//! If ANY tier fails, the engine is INVALID.
//!
//! ## Tiers
//! - T0: Graph Construction
//! - T1: Cross-Endpoint Realization
//! - T2: Subscription Binding
//! - T3: Actor Traffic

use std::sync::Arc;
use std::time::{Duration, Instant};
use tragen_core::actors::sampling::RngSource;
use tragen_core::actors::{Actor, Breach, Notifier, Reader, Updater};
use tragen_core::{
    MemoryServer, NamespaceGraph, NodeKind, TragenError, UaEndpoint, UpdateMode, Value,
    VariableFlags,
};

/// Line1 / Tank1 / Level (50.0, writable, regularly updated).
fn tank_line() -> NamespaceGraph {
    let mut graph = NamespaceGraph::new();
    graph.add_folder("Line1", 1, None).expect("folder");
    graph.add_object("Tank1", 1, Some("Line1")).expect("object");
    graph
        .add_variable(
            "Level",
            50.0,
            1,
            Some("Tank1"),
            VariableFlags::new().writable().update(UpdateMode::Regular),
        )
        .expect("variable");
    graph
}

fn listening_server() -> Arc<MemoryServer> {
    let server = Arc::new(MemoryServer::new("opc.tcp://0.0.0.0:4840/tragen0/server0/", "server0"));
    server.connect().expect("listen");
    server
}

// =============================================================================
// TIER T0: GRAPH CONSTRUCTION
// =============================================================================

mod t0_graph_construction {
    use super::*;

    /// T0.1: Duplicate siblings are rejected and leave the tree unchanged.
    #[test]
    fn duplicate_sibling_rejected() {
        let mut graph = tank_line();
        let before = graph.show();

        let err = graph.add_variable("Level", 1.0, 1, Some("Tank1"), VariableFlags::new());
        assert!(matches!(err, Err(TragenError::DuplicateName { .. })));
        let err = graph.add_folder("Line1", 1, None);
        assert!(matches!(err, Err(TragenError::DuplicateName { .. })));

        assert_eq!(graph.show(), before);
    }

    /// T0.2: Non-text properties are rejected before attachment.
    #[test]
    fn non_text_property_rejected() {
        let mut graph = tank_line();
        let count = graph.node_count();
        for value in [Value::Bool(true), Value::Int(3), Value::Double(1.5)] {
            let err = graph.add_property("Serial", value, 1, Some("Tank1"));
            assert!(matches!(err, Err(TragenError::InvalidValueType { .. })));
        }
        assert_eq!(graph.node_count(), count);
    }

    /// T0.3: Bare-name lookup resolves zero, one, or many matches as specified.
    #[test]
    fn bare_name_resolution() {
        let mut graph = tank_line();
        graph
            .add_variable("Temp", 20.0, 1, Some("Tank1"), VariableFlags::new())
            .expect("unique parent");
        assert!(matches!(
            graph.add_variable("X", 1.0, 1, Some("Tank9"), VariableFlags::new()),
            Err(TragenError::UnresolvedPath(_))
        ));

        graph.add_folder("Line2", 1, None).expect("line2");
        graph.add_object("Tank1", 1, Some("Line2")).expect("second Tank1");
        assert!(matches!(
            graph.add_variable("Y", 1.0, 1, Some("Tank1"), VariableFlags::new()),
            Err(TragenError::AmbiguousPath { matches: 2, .. })
        ));
        assert_eq!(
            graph
                .find_by_name("Tank1", NodeKind::Object, None)
                .expect("find")
                .len(),
            2
        );
    }

    /// T0.4: Siblings of different roles cannot share a name.
    #[test]
    fn cross_role_sibling_rejected() {
        let mut graph = tank_line();
        let before = graph.show();

        let err = graph.add_folder("Tank1", 1, Some("Line1"));
        assert!(matches!(
            err,
            Err(TragenError::NameClash {
                kind: NodeKind::Folder,
                existing: NodeKind::Object,
                ..
            })
        ));
        let err = graph.add_property("Level", "cm", 1, Some("Tank1"));
        assert!(matches!(err, Err(TragenError::NameClash { .. })));

        assert_eq!(graph.show(), before);
    }

    /// T0.5: The diagnostic dump shows every node once.
    #[test]
    fn show_lists_every_node() {
        let graph = tank_line();
        assert_eq!(graph.show().lines().count(), graph.node_count());
    }
}

// =============================================================================
// TIER T1: CROSS-ENDPOINT REALIZATION
// =============================================================================

mod t1_realization {
    use super::*;
    use tragen_core::{realize_on_client, realize_on_server};

    /// T1.1: Server and client realizations have identical shape.
    #[test]
    fn identical_shape_across_endpoints() {
        let graph = tank_line();
        let server = listening_server();
        let server_tree = realize_on_server(&graph, server.as_ref()).expect("server");

        let clients: Vec<_> = (0..3).map(|i| server.client(format!("client{i}"))).collect();
        for client in &clients {
            client.connect().expect("connect");
            let tree = realize_on_client(&graph, client).expect("client");
            assert_eq!(tree.shape(), server_tree.shape());
            server_tree.correspond(&tree).expect("correspond");
        }
    }

    /// T1.2: Client handles differ from server handles but reach the same node.
    #[test]
    fn handles_are_endpoint_local() {
        let graph = tank_line();
        let server = listening_server();
        let server_tree = realize_on_server(&graph, server.as_ref()).expect("server");
        let client = server.client("client0");
        client.connect().expect("connect");
        let client_tree = realize_on_client(&graph, &client).expect("client");

        let server_level = server_tree.iter().last().expect("level").handle;
        let client_level = client_tree.iter().last().expect("level").handle;
        server
            .write_value(server_level, Value::Double(42.0))
            .expect("server write");
        assert_eq!(
            client.read_value(client_level).expect("client read"),
            Value::Double(42.0)
        );
    }

    /// T1.3: A rejected create aborts the pass.
    #[test]
    fn realization_aborts_on_rejection() {
        let graph = tank_line();
        let server = listening_server();
        let client = server.client("client0");
        client.connect().expect("connect");
        // Clients cannot create nodes.
        let err = tragen_core::realize::EndpointRealizer::new(
            &client,
            tragen_core::realize::RealizeMode::Create,
        )
        .realize(&graph);
        assert!(matches!(err, Err(TragenError::Realization { .. })));
    }
}

// =============================================================================
// TIER T2: SUBSCRIPTION BINDING
// =============================================================================

mod t2_subscriptions {
    use super::*;
    use tragen_core::primitives::NOTIFIER_PERIOD;
    use tragen_core::{
        Notification, NotificationRegistry, RecordingHandler, SubscriptionBinder,
        SubscriptionKind, SubscriptionTable, realize_on_client, realize_on_server,
    };

    /// T2.1: Binding twice replaces entries; unbind_all leaves nothing.
    #[test]
    fn rebind_then_unbind() {
        let mut graph = tank_line();
        graph
            .add_variable(
                "Temp",
                20.0,
                1,
                Some("Tank1"),
                VariableFlags::new().update(UpdateMode::Irregular),
            )
            .expect("temp");
        let server = listening_server();
        let server_tree = realize_on_server(&graph, server.as_ref()).expect("server");
        NotificationRegistry::setup(&graph, &server_tree, server.as_ref()).expect("sources");

        let client = server.client("client0");
        client.connect().expect("connect");
        let tree = realize_on_client(&graph, &client).expect("client");
        let binder = SubscriptionBinder::new(
            &client,
            Arc::new(RecordingHandler::new()),
            Duration::from_millis(500),
        );

        let mut table = SubscriptionTable::new();
        binder.bind(&tree, &graph, &mut table).expect("bind");
        binder.bind(&tree, &graph, &mut table).expect("rebind");
        assert_eq!(table.len(), 2);
        assert_eq!(table.count(SubscriptionKind::Event), 1);
        assert_eq!(server.monitored_item_count(), 2);

        binder.unbind_all(&mut table).expect("unbind");
        assert!(table.is_empty());
        assert_eq!(server.monitored_item_count(), 0);
    }

    /// T2.2: Threshold events reach the client that subscribed to them.
    #[test]
    fn threshold_event_delivered() {
        let graph = tank_line();
        let server = listening_server();
        let server_tree = realize_on_server(&graph, server.as_ref()).expect("server");
        let registry =
            NotificationRegistry::setup(&graph, &server_tree, server.as_ref()).expect("sources");

        let client = server.client("client0");
        client.connect().expect("connect");
        let tree = realize_on_client(&graph, &client).expect("client");
        let handler = Arc::new(RecordingHandler::new());
        let binder =
            SubscriptionBinder::new(&client, handler.clone(), Duration::from_millis(500));
        let mut table = SubscriptionTable::new();
        binder.bind(&tree, &graph, &mut table).expect("bind");

        let (key, source) = registry.iter().next().expect("one source");
        server
            .trigger_event(source.generator, &format!("[#] Warning {}!", key.name))
            .expect("trigger");

        let deadline = Instant::now() + Duration::from_secs(2);
        while handler.event_count() == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(handler.event_count(), 1);
    }

    /// T2.3: A notifier breach reaches the subscribed client with its
    /// warning text, for both directions.
    #[test]
    fn notifier_breach_delivered() {
        let graph = tank_line();
        let server = listening_server();
        let endpoint: Arc<dyn UaEndpoint> = server.clone();
        let server_tree = realize_on_server(&graph, server.as_ref()).expect("server");
        let registry =
            NotificationRegistry::setup(&graph, &server_tree, server.as_ref()).expect("sources");
        let (key, source) = registry.iter().next().expect("one source");
        let level = server_tree.handle_of(key).expect("level");

        let client = server.client("client0");
        client.connect().expect("connect");
        let tree = realize_on_client(&graph, &client).expect("client");
        let handler = Arc::new(RecordingHandler::new());
        let binder =
            SubscriptionBinder::new(&client, handler.clone(), Duration::from_millis(500));
        let mut table = SubscriptionTable::new();
        binder.bind(&tree, &graph, &mut table).expect("bind");

        let mut notifier =
            Notifier::new("Level", endpoint, level, source.generator, None, None, NOTIFIER_PERIOD)
                .expect("notifier");
        server.write_value(level, Value::Double(61.0)).expect("write");
        assert_eq!(notifier.check().expect("above"), Some(Breach::Above));
        server.write_value(level, Value::Double(10.0)).expect("write");
        assert_eq!(notifier.check().expect("below"), Some(Breach::Below));

        let deadline = Instant::now() + Duration::from_secs(2);
        while handler.event_count() < 2 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        let messages: Vec<String> = handler
            .received()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Event { message, .. } => Some(message),
                Notification::DataChange { .. } => None,
            })
            .collect();
        assert_eq!(
            messages,
            vec![
                "[#] Warning Level! Above critical value.".to_string(),
                "[#] Warning Level! Below critical value.".to_string(),
            ]
        );
    }
}

// =============================================================================
// TIER T3: ACTOR TRAFFIC
// =============================================================================

mod t3_actors {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tragen_core::primitives::NOTIFIER_PERIOD;
    use tragen_core::{NotificationRegistry, realize_on_client, realize_on_server};

    /// T3.1: Line1/Tank1/Level scenario: one update stays near 50, the
    /// notifier fires exactly when the value leaves 40..60 and re-centers.
    #[test]
    fn tank_level_scenario() {
        let graph = tank_line();
        let server = listening_server();
        let endpoint: Arc<dyn UaEndpoint> = server.clone();
        let tree = realize_on_server(&graph, server.as_ref()).expect("server");
        let registry =
            NotificationRegistry::setup(&graph, &tree, server.as_ref()).expect("sources");
        let (key, source) = registry.iter().next().expect("source");
        let level = tree.handle_of(key).expect("level");

        let mut updater = Updater::new(
            "Line1/Tank1/Level",
            Arc::clone(&endpoint),
            level,
            UpdateMode::Regular,
            Duration::from_millis(100),
            0.15,
            600.0,
            StdRng::seed_from_u64(2024),
        );
        let mut notifier = Notifier::new(
            "Level",
            Arc::clone(&endpoint),
            level,
            source.generator,
            None,
            None,
            NOTIFIER_PERIOD,
        )
        .expect("notifier");
        let (lower, upper) = notifier.bounds();
        assert!((lower - 40.0).abs() < 1e-9);
        assert!((upper - 60.0).abs() < 1e-9);

        updater.step().expect("update");
        let after = server.read_value(level).expect("read").as_f64().expect("numeric");
        assert_ne!(after, 50.0);
        assert!((after - 50.0).abs() < 1.0);
        assert_eq!(notifier.check().expect("in band"), None);

        server.write_value(level, Value::Double(61.0)).expect("write");
        assert_eq!(notifier.check().expect("above"), Some(Breach::Above));
        let (lower, upper) = notifier.bounds();
        assert!((lower - 48.8).abs() < 1e-9);
        assert!((upper - 73.2).abs() < 1e-9);
        assert_eq!(notifier.check().expect("re-centered"), None);
    }

    /// T3.2: An integer variable keeps moving under its updater and is
    /// written back as a double.
    #[test]
    fn integer_variable_random_walk() {
        let mut graph = NamespaceGraph::new();
        graph
            .add_variable(
                "Volume",
                1200_i64,
                1,
                None,
                VariableFlags::new().update(UpdateMode::Irregular),
            )
            .expect("variable");
        let server = listening_server();
        let endpoint: Arc<dyn UaEndpoint> = server.clone();
        let tree = realize_on_server(&graph, server.as_ref()).expect("server");
        let volume = tree.iter().next().expect("volume").handle;

        let mut updater = Updater::new(
            "Volume",
            endpoint,
            volume,
            UpdateMode::Irregular,
            Duration::from_secs(3),
            0.15,
            600.0,
            StdRng::seed_from_u64(1200),
        );
        let mut previous = Value::Int(1200);
        for _ in 0..50 {
            updater.step().expect("update");
            let current = server.read_value(volume).expect("read");
            assert!(matches!(current, Value::Double(_)));
            assert_ne!(current, previous);
            previous = current;
        }
        let last = previous.as_f64().expect("numeric");
        assert!((last - 1200.0).abs() < 10.0);
    }

    /// T3.3: A reader over 3 items reads each of them within 1000 iterations.
    #[test]
    fn reader_does_not_starve_items() {
        let mut graph = NamespaceGraph::new();
        for name in ["A", "B", "C"] {
            graph
                .add_variable(name, 1.0, 1, None, VariableFlags::new())
                .expect("variable");
        }
        let server = listening_server();
        realize_on_server(&graph, server.as_ref()).expect("server");
        let client: Arc<dyn UaEndpoint> = Arc::new(server.client("client0"));
        client.connect().expect("connect");
        let tree = realize_on_client(&graph, client.as_ref()).expect("client");
        let items = tree.iter().map(|n| (n.key.clone(), n.handle)).collect();

        let mut reader = Reader::new(
            client,
            items,
            Duration::from_millis(500),
            RngSource::new(Some(99)).next_rng(),
        )
        .expect("reader");
        for _ in 0..1000 {
            reader.step().expect("read");
        }
        assert_eq!(reader.hits().len(), 3);
        assert!(reader.hits().iter().all(|&h| h > 0));
        assert_eq!(reader.hits().iter().sum::<u64>(), 1000);
    }
}
