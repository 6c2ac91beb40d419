#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use crate::config::SessionConfig;
    use crate::control_error::ControlError;
    use crate::grasping::GraspPolicy;
    use crate::integrator::ControlModeKind;
    use crate::teleop::Teleoperation;

    const READ_ERROR: &'static str = "Failed to load session from file";

    #[test]
    fn test_session_from_yaml() {
        let filename = "src/tests/data/clutch_session.yaml";
        let loaded = SessionConfig::from_yaml_file(filename).expect(READ_ERROR);

        assert_eq!(loaded.control.kind, ControlModeKind::Clutch);
        assert_eq!(loaded.control.activation(), "grip-hold");
        assert_eq!(loaded.control.slerp_rate, 2.5);
        let [rx, ry, rz] = loaded.control.correction;
        assert!((rx + PI / 3.0).abs() < 1e-12);
        assert!((ry - PI / 2.0).abs() < 1e-12);
        assert_eq!(rz, 0.0);
        assert!(loaded.control.show_offset_indicator);
        assert_eq!(loaded.grasping.as_ref().map(|g| g.activation.as_str()), Some("trigger-toggle"));

        let mut teleop = Teleoperation::new();
        teleop.load_session(&loaded).expect("session must load");
        assert_eq!(
            teleop.mode_instructions(),
            "Activate: Press and hold the grip button.\nDeactivate: Release the grip button."
        );
        let grasping = teleop.session().grasping().expect("grasping loaded");
        assert_eq!(grasping.policy(), GraspPolicy::TriggerToggle);
    }

    #[test]
    fn test_angle_forms() {
        let loaded = SessionConfig::from_yaml_str(
            "control:\n  kind: redirected\n  slerp_rate: 1.0\n  correction: [deg(-60.0), deg(90), 0]\n",
        )
        .expect(READ_ERROR);
        let [rx, ry, rz] = loaded.control.correction;
        assert!((rx + PI / 3.0).abs() < 1e-12);
        assert!((ry - PI / 2.0).abs() < 1e-12);
        assert_eq!(rz, 0.0);
        assert_eq!(loaded.control.slerp_rate, 1.0);

        // Plain numbers are radians
        let loaded = SessionConfig::from_yaml_str("control:\n  kind: clutch\n  correction: [0.5, -1.0, 1.5]\n")
            .expect(READ_ERROR);
        assert_eq!(loaded.control.correction, [0.5, -1.0, 1.5]);
    }

    #[test]
    fn test_session_defaults_from_yaml() {
        let filename = "src/tests/data/drag_session.yaml";
        let loaded = SessionConfig::from_yaml_file(filename).expect(READ_ERROR);

        assert_eq!(loaded.control.kind, ControlModeKind::Drag);
        assert_eq!(loaded.control.activation(), "grip-auto");
        assert_eq!(loaded.control.activation_radius, 0.15);
        assert_eq!(loaded.control.offset, [0.0, 0.0, 0.0, 1.0]);
        assert!(loaded.grasping.is_none());
    }

    #[test]
    fn test_unknown_policy_fails_at_load() {
        let filename = "src/tests/data/bad_policy.yaml";
        let loaded = SessionConfig::from_yaml_file(filename).expect(READ_ERROR);

        let mut teleop = Teleoperation::new();
        let err = teleop.load_session(&loaded).unwrap_err();
        assert!(matches!(err, ControlError::UnknownPolicy { .. }));
        assert_eq!(err.to_string(), "Control mode \"grip-auto\" does not exist for Redirected Control");
        assert!(teleop.session().control().is_none());
        assert_eq!(teleop.mode_instructions(), "");
    }

    #[test]
    fn test_bad_offset_rejected() {
        let result = SessionConfig::from_yaml_file("src/tests/data/bad_offset.yaml");
        assert!(matches!(result, Err(ControlError::InvalidParameter(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = SessionConfig::from_yaml_file("src/tests/data/does_not_exist.yaml");
        assert!(matches!(result, Err(ControlError::IoError(_))));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = SessionConfig::from_yaml_str("control:\n  kind: clutch\n  slerp: 1.0\n");
        assert!(matches!(result, Err(ControlError::ParseError(_))));

        let result = SessionConfig::from_yaml_str("control:\n  kind: teleport\n");
        assert!(matches!(result, Err(ControlError::ParseError(_))));
    }
}
