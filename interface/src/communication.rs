use brain::Waypoint;
use edgefirst_schemas::builtin_interfaces::Time;
use edgefirst_schemas::std_msgs::Header;
use log::{debug, warn};
use motion::{SkeletonLayout, WorldPose};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use zenoh::Session;

/// ROS 2 CDR encapsulation header, little endian.
const CDR_LE_HEADER: [u8; 4] = [0x00, 0x01, 0x00, 0x00];

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JointState {
    pub header: Header,
    pub name: Vec<String>,
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
    pub effort: Vec<f64>,
}

impl Default for JointState {
    fn default() -> Self {
        Self {
            header: empty_header(),
            name: Vec::new(),
            position: Vec::new(),
            velocity: Vec::new(),
            effort: Vec::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

/// Same wire layout as `geometry_msgs/PoseStamped`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RootPose {
    pub header: Header,
    pub position: Point,
    pub orientation: Orientation,
}

/// Planar route to compile and run.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WaypointList {
    pub header: Header,
    pub waypoints: Vec<Waypoint>,
}

fn empty_header() -> Header {
    Header {
        stamp: Time::new(0, 0),
        frame_id: String::new(),
    }
}

fn stamped(frame_id: &str) -> Header {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    Header {
        stamp: Time::new(now.as_secs() as i32, now.subsec_nanos()),
        frame_id: frame_id.to_string(),
    }
}

pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut payload = CDR_LE_HEADER.to_vec();
    payload.extend(cdr::serialize::<_, _, cdr::CdrLe>(msg, cdr::Infinite)?);
    Ok(payload)
}

pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, Box<dyn std::error::Error>> {
    if payload.len() <= CDR_LE_HEADER.len() {
        return Err("payload too short for a ROS 2 message".into());
    }
    let mut deserializer =
        cdr::Deserializer::<_, _, cdr::LittleEndian>::new(&payload[CDR_LE_HEADER.len()..], cdr::Infinite);
    Ok(T::deserialize(&mut deserializer)?)
}

/// Joint names and angles for the joints present in `pose`. Absent channels are skipped.
pub fn joint_state(pose: &WorldPose, layout: &SkeletonLayout) -> JointState {
    let mut msg = JointState {
        header: stamped("robot_base"),
        ..JointState::default()
    };
    for (name, angle) in layout.joints.iter().zip(&pose.joints) {
        if let Some(angle) = angle {
            msg.name.push((*name).to_string());
            msg.position.push(*angle);
        }
    }
    msg
}

pub fn root_pose(pose: &WorldPose) -> RootPose {
    let q = pose.rotation.quaternion();
    RootPose {
        header: stamped("world"),
        position: Point {
            x: pose.position.x,
            y: pose.position.y,
            z: pose.position.z,
        },
        orientation: Orientation {
            x: q.i,
            y: q.j,
            z: q.k,
            w: q.w,
        },
    }
}

pub struct CommunicationLayer {
    session: Session,
    joint_state_key: String,
    root_pose_key: String,
    waypoint_key: String,
}

impl CommunicationLayer {
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let config = zenoh::config::Config::default();
        let session = zenoh::open(config).await.map_err(|e| e.to_string())?;

        Ok(Self {
            session,
            joint_state_key: "rt/robot/joint_states".to_string(),
            root_pose_key: "rt/robot/root_pose".to_string(),
            waypoint_key: "rt/robot/waypoints".to_string(),
        })
    }

    pub async fn publish_pose(&self, pose: &WorldPose, layout: &SkeletonLayout) -> Result<(), Box<dyn std::error::Error>> {
        let joints = encode(&joint_state(pose, layout))?;
        self.session.put(&self.joint_state_key, joints).await.map_err(|e| e.to_string())?;
        let root = encode(&root_pose(pose))?;
        self.session.put(&self.root_pose_key, root).await.map_err(|e| e.to_string())?;
        Ok(())
    }

    pub async fn subscribe_waypoints<F>(&self, callback: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Fn(Vec<Waypoint>) + Send + Sync + 'static,
    {
        let subscriber = self.session.declare_subscriber(&self.waypoint_key).await.map_err(|e| e.to_string())?;
        debug!("listening for routes on {}", self.waypoint_key);

        tokio::spawn(async move {
            while let Ok(sample) = subscriber.recv_async().await {
                let payload = sample.payload().to_bytes();
                match decode::<WaypointList>(&payload) {
                    Ok(msg) => callback(msg.waypoints),
                    Err(e) => warn!("dropping waypoint message: {e}"),
                }
            }
        });
        Ok(())
    }
}
