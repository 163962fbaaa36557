//! Built-in reference passages used to bootstrap an empty index.

use crate::schema::ManualChunk;

pub fn reference_manuals() -> Vec<ManualChunk> {
    vec![
        ManualChunk::new(
            "Error E-302 indicates a door obstruction during the closing cycle. \
             This is often caused by debris in the bottom track or a misaligned photo-eye sensor. \
             Technicians should inspect the sill groove and clean any particulate matter.",
            "KONE_Door_Systems_Maintenance_2024.pdf",
            42,
            vec!["E-302".to_string()],
        ),
        ManualChunk::new(
            "High vibration levels (> 4.0 Hz) in the main cabin often suggest \
             wear on the guide rail rollers. If accompanied by screeching noise, \
             verify lubrication levels on the guide shoes immediately to prevent rail damage.",
            "KONE_Ride_Comfort_Standards.pdf",
            12,
            vec!["W-104".to_string(), "VIB-HIGH".to_string()],
        ),
        ManualChunk::new(
            "Safety Protocol for Pit Access: Before entering the elevator pit, \
             engage the pit stop switch and verify the car is secured. \
             Never enter the pit if water is present.",
            "KONE_Global_Safety_Manual.pdf",
            5,
            Vec::new(),
        ),
    ]
}
